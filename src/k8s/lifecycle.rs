//! Apply, poll and clean up resources that are expected to terminate

use crate::k8s::kubectl::FailurePolicy;
use crate::k8s::object::KubeResource;
use crate::utils::errors::{Error, Result};
use crate::utils::polling::{PollOutcome, PollingConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A workload that runs to completion (Pod, Job)
pub trait RunToCompletion<'a>: KubeResource<'a> {
    /// Argument naming this resource for `kubectl logs`
    fn logs_target(&self) -> String;

    /// Classify the status of a live object
    fn outcome(live: &Value) -> Result<PollOutcome>;

    fn fetch_logs(&self) -> Result<Vec<u8>> {
        // Pods cloned from a template may carry sidecars
        let command = format!(
            "logs {} --all-containers=true",
            shell_words::quote(&self.logs_target())
        );
        let output = self
            .object()
            .execute_scoped(&command, FailurePolicy::Propagate)?;
        Ok(output.unwrap_or_default())
    }

    /// Apply the definition and wait for it to succeed.
    ///
    /// On failure or timeout the logs are captured, the object is deleted
    /// and the logs are returned inside the error.
    fn execute(&self, polling: &PollingConfig) -> Result<()> {
        let resource = self.object().to_string();
        let span = tracing::info_span!("execute", resource = %resource);
        let _enter = span.enter();

        tracing::info!("execution initiated");
        self.apply(FailurePolicy::Propagate)?;

        let outcome = polling.poll(|attempt| {
            let live = self.get()?;
            let outcome = Self::outcome(&live)?;
            if !outcome.is_terminal() {
                tracing::info!(attempt, status = %live["status"], "waiting for completion...");
            }
            Ok(outcome)
        })?;
        tracing::debug!(outcome = %outcome, "polling finished");

        match outcome {
            PollOutcome::Succeeded => {
                tracing::info!("successfully completed");
                Ok(())
            }
            PollOutcome::Failed => {
                let logs = self.abort();
                Err(Error::ExecutionFailed { resource, logs })
            }
            PollOutcome::Pending | PollOutcome::TimedOut => {
                let logs = self.abort();
                Err(Error::ExecutionTimeout {
                    resource,
                    attempts: polling.max_attempts,
                    logs,
                })
            }
        }
    }

    /// Capture logs and a description, then delete; nothing here raises
    fn abort(&self) -> String {
        let logs = match self.fetch_logs() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                tracing::warn!(error = %err, "could not fetch logs");
                String::new()
            }
        };
        if !logs.is_empty() {
            tracing::warn!(logs = %logs, "captured logs");
        }

        if let Ok(Some(description)) = self.describe(FailurePolicy::Tolerate) {
            tracing::info!(description = %description, "state before cleanup");
        }

        if let Err(err) = self.delete(FailurePolicy::Tolerate) {
            tracing::warn!(error = %err, "cleanup failed");
        }

        logs
    }
}

/// Read the `status` block of a live object, defaulting when absent
pub(crate) fn status_of<T>(live: &Value) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match live.get("status") {
        Some(Value::Null) | None => Ok(T::default()),
        Some(status) => serde_json::from_value(status.clone())
            .map_err(|e| Error::parse("object status", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodStatus;
    use serde_json::json;

    #[test]
    fn test_status_defaults_when_absent() {
        let status: PodStatus = status_of(&json!({"kind": "Pod"})).unwrap();
        assert!(status.phase.is_none());
    }

    #[test]
    fn test_status_is_typed() {
        let status: PodStatus = status_of(&json!({"status": {"phase": "Running"}})).unwrap();
        assert_eq!(status.phase.as_deref(), Some("Running"));
    }

    #[test]
    fn test_status_type_mismatch_is_parse_error() {
        let result: Result<PodStatus> = status_of(&json!({"status": {"phase": 3}}));
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
