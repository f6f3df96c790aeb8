//! Prerequisite checks for the kubectl binary and cluster access

use crate::k8s::kubectl::Executor;
use colored::Colorize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrereqError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String, hint: String },

    #[error("Cluster is not reachable: {reason}")]
    Unreachable { reason: String },
}

/// Result of a single check
#[derive(Debug, Clone)]
pub enum CheckResult {
    Pass(String),
    Fail(String),
}

impl CheckResult {
    pub fn is_error(&self) -> bool {
        matches!(self, CheckResult::Fail(_))
    }

    pub fn display(&self) {
        match self {
            CheckResult::Pass(msg) => println!("  {} {}", "✓".green(), msg),
            CheckResult::Fail(msg) => println!("  {} {}", "✗".red(), msg),
        }
    }
}

impl From<Result<String, PrereqError>> for CheckResult {
    fn from(result: Result<String, PrereqError>) -> Self {
        match result {
            Ok(msg) => CheckResult::Pass(msg),
            Err(PrereqError::NotFound { name, hint }) => {
                CheckResult::Fail(format!("{} not found. {}", name, hint))
            }
            Err(err) => CheckResult::Fail(err.to_string()),
        }
    }
}

/// Locate `bin` on PATH (or verify it when given as a path)
pub fn find_tool(bin: &str) -> Result<PathBuf, PrereqError> {
    which::which(bin).map_err(|_| PrereqError::NotFound {
        name: bin.to_string(),
        hint: "Install from: https://kubernetes.io/docs/tasks/tools/".to_string(),
    })
}

/// Ask the cluster for its version through `kubectl`
pub fn check_cluster(kubectl: &dyn Executor) -> Result<String, PrereqError> {
    let output = kubectl
        .run("version -o json", None)
        .map_err(|e| PrereqError::Unreachable {
            reason: e.to_string(),
        })?;

    let version: serde_json::Value =
        serde_json::from_slice(&output).map_err(|e| PrereqError::Unreachable {
            reason: e.to_string(),
        })?;

    match version.pointer("/serverVersion/gitVersion").and_then(|v| v.as_str()) {
        Some(server) => Ok(format!("Cluster reachable (server {})", server)),
        None => Err(PrereqError::Unreachable {
            reason: "kubectl reported no server version".to_string(),
        }),
    }
}

/// Run every check, printing each result. Returns whether all passed.
pub fn run_checks(bin: &str, kubectl: &dyn Executor) -> bool {
    let mut results = vec![CheckResult::from(
        find_tool(bin).map(|path| format!("{} found at {}", bin, path.display())),
    )];
    if !results[0].is_error() {
        results.push(check_cluster(kubectl).into());
    }

    for result in &results {
        result.display();
    }

    !results.iter().any(CheckResult::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::mock::MockKubectl;
    use serde_json::json;

    #[test]
    fn test_available_tool() {
        assert!(find_tool("sh").is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let err = find_tool("nonexistent-tool-xyz").unwrap_err();
        assert!(matches!(err, PrereqError::NotFound { .. }));
        assert!(CheckResult::from(Err::<String, _>(err)).is_error());
    }

    #[test]
    fn test_cluster_reachable() {
        let kubectl = MockKubectl::new().with_output(
            "version",
            json!({"clientVersion": {"gitVersion": "v1.31.0"}, "serverVersion": {"gitVersion": "v1.30.2"}}),
        );
        let msg = check_cluster(&kubectl).unwrap();
        assert!(msg.contains("v1.30.2"));
    }

    #[test]
    fn test_cluster_unreachable() {
        let kubectl = MockKubectl::new().failing_with("version", "connection refused");
        let err = check_cluster(&kubectl).unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
