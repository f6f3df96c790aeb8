//! Command implementations for the kubectl-bridge CLI

pub mod deploy;
pub mod execute;
pub mod object;

use crate::config::settings::Settings;
use crate::config::template::{self, Params};
use crate::k8s::kubectl::Kubectl;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Where a definition comes from: a template file and its parameters
#[derive(Debug, Clone)]
pub struct DefinitionSource {
    pub file: PathBuf,
    pub params: Params,
    pub anchors: Option<PathBuf>,
}

impl DefinitionSource {
    pub fn render(&self) -> Result<String> {
        template::render_definition(&self.file, &self.params)
            .with_context(|| format!("Failed to render {}", self.file.display()))
    }

    pub fn load(&self) -> Result<Value> {
        template::load_definition(&self.file, &self.params, self.anchors.as_deref())
            .with_context(|| format!("Failed to load definition from {}", self.file.display()))
    }
}

/// Settings and executor shared by every command
pub struct CommandContext {
    pub settings: Settings,
    pub kubectl: Kubectl,
    /// Show spinners while waiting on the cluster
    pub show_progress: bool,
}

impl CommandContext {
    pub fn new(settings: Settings, kubeconfig: Option<&Path>, verbose: u8) -> Result<Self> {
        let kubectl = settings.kubectl(kubeconfig)?;
        let show_progress = settings.behavior.show_progress && verbose == 0;
        Ok(Self {
            settings,
            kubectl,
            show_progress,
        })
    }
}

/// Parse `key=value` into a pair
pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

/// Container fields from `key=value` pairs; values are JSON when they parse as JSON
pub fn container_fields(pairs: &[(String, String)]) -> serde_json::Map<String, Value> {
    pairs
        .iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            (key.clone(), value)
        })
        .collect()
}
