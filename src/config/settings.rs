//! Configuration file support for kubectl-bridge

use crate::k8s::deployment::JobOptions;
use crate::k8s::kubectl::Kubectl;
use crate::utils::polling::{DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS, PollingConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub kubectl: KubectlSettings,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub job: JobSettings,

    #[serde(default)]
    pub behavior: Behavior,
}

/// How kubectl is invoked
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KubectlSettings {
    #[serde(default = "default_bin")]
    pub bin: String,

    /// Shell-quoted flags added to every call, e.g. "--context prod"
    #[serde(default)]
    pub global_flags: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
}

/// Status polling budget
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

/// Defaults for jobs spawned from deployments
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JobSettings {
    #[serde(default = "default_ttl_seconds_after_finished")]
    pub ttl_seconds_after_finished: i32,

    #[serde(default)]
    pub backoff_limit: i32,
}

/// Behavior settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Behavior {
    #[serde(default = "default_true")]
    pub confirm_destructive: bool,

    #[serde(default = "default_true")]
    pub show_progress: bool,
}

// Default value functions
fn default_bin() -> String {
    "kubectl".to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL.as_secs()
}

fn default_ttl_seconds_after_finished() -> i32 {
    JobOptions::default().ttl_seconds_after_finished
}

fn default_true() -> bool {
    true
}

impl Default for KubectlSettings {
    fn default() -> Self {
        Self {
            bin: default_bin(),
            global_flags: String::new(),
            kubeconfig: None,
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            ttl_seconds_after_finished: default_ttl_seconds_after_finished(),
            backoff_limit: 0,
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            confirm_destructive: default_true(),
            show_progress: default_true(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, or the first file found in the
    /// standard locations, or fall back to defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .kubectl-bridge.toml in current directory
    /// 2. ~/.config/kubectl-bridge/config.toml (XDG config directory)
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(".kubectl-bridge.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("kubectl-bridge").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    /// Build the kubectl executor, preferring `kubeconfig_override` over the file
    pub fn kubectl(&self, kubeconfig_override: Option<&Path>) -> Result<Kubectl> {
        let mut kubectl = Kubectl::new(&self.kubectl.bin)
            .global_flags(&self.kubectl.global_flags)
            .context("Invalid [kubectl] global_flags")?;

        let kubeconfig = kubeconfig_override
            .map(Path::to_path_buf)
            .or_else(|| self.kubectl.kubeconfig.as_ref().map(PathBuf::from));
        if let Some(path) = kubeconfig {
            kubectl = kubectl.kubeconfig(path);
        }

        Ok(kubectl)
    }

    /// Polling budget, with optional command-line overrides
    pub fn polling(&self, attempts: Option<u32>, interval_secs: Option<u64>) -> PollingConfig {
        PollingConfig::new(
            attempts.unwrap_or(self.polling.max_attempts),
            Duration::from_secs(interval_secs.unwrap_or(self.polling.interval_secs)),
        )
    }

    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            ttl_seconds_after_finished: self.job.ttl_seconds_after_finished,
            backoff_limit: self.job.backoff_limit,
            ..Default::default()
        }
    }

    /// Generate example config file content
    pub fn example_config() -> String {
        let header = "# kubectl-bridge configuration file\n\
                      # Place this file at ~/.config/kubectl-bridge/config.toml or .kubectl-bridge.toml in your project\n\n";

        match toml::to_string_pretty(&Settings::default()) {
            Ok(config) => format!("{}{}", header, config),
            Err(_) => format!(
                "{}[kubectl]\nbin = \"kubectl\"\nglobal_flags = \"\"\n\n\
                 [polling]\nmax_attempts = 30\ninterval_secs = 10\n\n\
                 [job]\nttl_seconds_after_finished = 30\nbackoff_limit = 0\n\n\
                 [behavior]\nconfirm_destructive = true\nshow_progress = true\n",
                header
            ),
        }
    }
}
