//! Settings file and definition templates

pub mod settings;
pub mod template;
