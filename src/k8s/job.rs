//! Batch jobs run to completion

use crate::k8s::lifecycle::{status_of, RunToCompletion};
use crate::k8s::object::{KubeObject, KubeResource};
use crate::utils::errors::Result;
use crate::utils::polling::PollOutcome;
use k8s_openapi::api::batch::v1::JobStatus;
use serde_json::Value;
use std::fmt;

#[derive(Debug)]
pub struct Job<'a> {
    object: KubeObject<'a>,
}

impl<'a> KubeResource<'a> for Job<'a> {
    const KIND: &'static str = "Job";

    fn from_object(object: KubeObject<'a>) -> Self {
        Self { object }
    }

    fn object(&self) -> &KubeObject<'a> {
        &self.object
    }
}

impl<'a> RunToCompletion<'a> for Job<'a> {
    fn logs_target(&self) -> String {
        format!("jobs/{}", self.object.name())
    }

    fn outcome(live: &Value) -> Result<PollOutcome> {
        let status: JobStatus = status_of(live)?;
        if status.failed.unwrap_or(0) > 0 {
            return Ok(PollOutcome::Failed);
        }
        if status.succeeded.unwrap_or(0) >= 1 {
            return Ok(PollOutcome::Succeeded);
        }
        Ok(PollOutcome::Pending)
    }
}

impl fmt::Display for Job<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.object, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::mock::MockKubectl;
    use crate::utils::errors::Error;
    use crate::utils::polling::PollingConfig;
    use serde_json::json;
    use std::time::Duration;

    fn definition() -> Value {
        json!({"apiVersion": "batch/v1", "kind": "Job", "metadata": {"name": "backfill"}})
    }

    fn polling() -> PollingConfig {
        PollingConfig::new(30, Duration::ZERO)
    }

    #[test]
    fn test_job_success() {
        let kubectl = MockKubectl::new().with_statuses(
            "Job",
            "backfill",
            vec![json!({"active": 1}), json!({"succeeded": 1})],
        );
        let job = Job::new(definition(), &kubectl).unwrap();

        job.execute(&polling()).unwrap();

        assert_eq!(kubectl.count("get"), 2);
        assert_eq!(kubectl.count("logs"), 0);
        assert_eq!(kubectl.count("delete"), 0);
    }

    #[test]
    fn test_job_failure_embeds_logs_in_error() {
        let kubectl = MockKubectl::new()
            .with_statuses("Job", "backfill", vec![json!({"failed": 1})])
            .with_raw_output("logs", "Traceback: KeyError 'user_id'");
        let job = Job::new(definition(), &kubectl).unwrap();

        let err = job.execute(&polling()).unwrap_err();

        assert!(matches!(err, Error::ExecutionFailed { .. }));
        assert!(err.to_string().contains("KeyError 'user_id'"));
        assert_eq!(kubectl.count("logs"), 1);
        assert_eq!(kubectl.count("delete"), 1);
        assert!(kubectl.commands().contains(&"logs jobs/backfill --all-containers=true".to_string()));
    }

    #[test]
    fn test_failure_wins_over_success_count() {
        let live = json!({"status": {"failed": 1, "succeeded": 1}});
        assert_eq!(Job::outcome(&live).unwrap(), PollOutcome::Failed);
    }

    #[test]
    fn test_pending_until_counts_appear() {
        assert_eq!(Job::outcome(&json!({})).unwrap(), PollOutcome::Pending);
        assert_eq!(
            Job::outcome(&json!({"status": {"failed": 0, "active": 1}})).unwrap(),
            PollOutcome::Pending
        );
    }
}
