//! Utility modules for kubectl-bridge

pub mod errors;
pub mod logger;
pub mod polling;
pub mod prereqs;
pub mod progress;
pub mod prompt;

// Re-export commonly used items
pub use errors::{display_error, Error, Result};
pub use logger::{log_info, log_warn};
pub use polling::{PollOutcome, PollingConfig};
pub use prompt::{confirm, confirm_unless};
