//! Error types for resource handles and lifecycles, with actionable suggestions

use colored::Colorize;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Required fields are missing from a resource definition
    #[error("malformed definition: {0}")]
    MalformedDefinition(String),

    /// The definition's kind does not match the resource type
    #[error("invalid kind {found} provided, expected {expected}")]
    InvalidKind { expected: String, found: String },

    #[error("{resource} not found in the cluster")]
    NotFound { resource: String },

    /// kubectl could not be started or exited non-zero
    #[error("command `{command}` failed{}\n{output}", exit_suffix(.code))]
    Executor {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{resource} execution failed\n{logs}")]
    ExecutionFailed { resource: String, logs: String },

    #[error("deployment of {resource} timed out after {attempts} attempts")]
    DeploymentTimeout { resource: String, attempts: u32 },

    #[error("{resource} execution timed out after {attempts} attempts\n{logs}")]
    ExecutionTimeout {
        resource: String,
        attempts: u32,
        logs: String,
    },

    #[error("no value supplied for template placeholder '${{{name}}}'")]
    MissingParameter { name: String },

    #[error("invalid placeholder `{text}` on line {line}")]
    InvalidPlaceholder { text: String, line: usize },

    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with exit code {}", c))
        .unwrap_or_default()
}

impl Error {
    pub(crate) fn parse(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Suggestions shown under the error message
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::MalformedDefinition(_) => vec![
                "Every definition needs `kind` and `metadata.name`".to_string(),
                "Render the template with `kubectl-bridge render` to inspect it".to_string(),
            ],
            Error::InvalidKind { expected, .. } => vec![format!(
                "Use a definition whose kind is {}",
                expected
            )],
            Error::NotFound { .. } => vec![
                "Apply the definition first".to_string(),
                "Check the namespace and context kubectl is pointed at".to_string(),
            ],
            Error::Executor { code: None, .. } => vec![
                "Verify kubectl is installed: kubectl-bridge check".to_string(),
                "Set [kubectl] bin in your config to point at the binary".to_string(),
            ],
            Error::Executor { .. } => vec![
                "Run with -vv to see the exact kubectl invocation".to_string(),
                "Verify cluster access with: kubectl cluster-info".to_string(),
            ],
            Error::ExecutionFailed { .. } => {
                vec!["Inspect the captured logs above for the failure cause".to_string()]
            }
            Error::DeploymentTimeout { resource, .. } => vec![
                format!(
                    "A rollback of {} was requested; confirm it with: kubectl rollout status",
                    resource
                ),
                "Increase the budget with --attempts or --interval".to_string(),
                "Check pod events with: kubectl get events".to_string(),
            ],
            Error::ExecutionTimeout { .. } => vec![
                "Increase the budget with --attempts or --interval".to_string(),
            ],
            Error::MissingParameter { name } => {
                vec![format!("Pass the value with: -p {}=<value>", name)]
            }
            Error::InvalidPlaceholder { .. } => vec![
                "Write a literal dollar sign as $$".to_string(),
                "Placeholder names use letters, digits and underscores: ${name}".to_string(),
            ],
            Error::Parse { .. } => vec!["Definitions must be JSON or YAML mappings".to_string()],
            Error::Io(_) => Vec::new(),
        }
    }

    /// Display the error with suggestions
    pub fn display(&self) {
        tracing::error!("{}", self);
        eprintln!("{} {}", "error:".red().bold(), self);

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            eprintln!();
            eprintln!("{}", "Suggestions:".yellow().bold());
            for suggestion in &suggestions {
                eprintln!("  {} {}", "→".blue(), suggestion);
            }
        }
    }
}

/// Display an error chain, with suggestions when it carries a library error
pub fn display_error(err: &anyhow::Error) {
    match err.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        Some(typed) => {
            if err.to_string() != typed.to_string() {
                eprintln!("{} {}", "context:".dimmed(), err);
            }
            typed.display();
        }
        None => eprintln!("{} {:#}", "error:".red().bold(), err),
    }
}
