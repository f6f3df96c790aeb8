//! Single pods run to completion

use crate::k8s::lifecycle::{status_of, RunToCompletion};
use crate::k8s::object::{KubeObject, KubeResource};
use crate::utils::errors::Result;
use crate::utils::polling::PollOutcome;
use k8s_openapi::api::core::v1::PodStatus;
use serde_json::Value;
use std::fmt;

#[derive(Debug)]
pub struct Pod<'a> {
    object: KubeObject<'a>,
}

impl<'a> KubeResource<'a> for Pod<'a> {
    const KIND: &'static str = "Pod";

    fn from_object(object: KubeObject<'a>) -> Self {
        Self { object }
    }

    fn object(&self) -> &KubeObject<'a> {
        &self.object
    }
}

impl<'a> RunToCompletion<'a> for Pod<'a> {
    fn logs_target(&self) -> String {
        self.object.name().to_string()
    }

    fn outcome(live: &Value) -> Result<PollOutcome> {
        let status: PodStatus = status_of(live)?;
        Ok(match status.phase.as_deref() {
            Some("Succeeded") => PollOutcome::Succeeded,
            Some("Failed") => PollOutcome::Failed,
            _ => PollOutcome::Pending,
        })
    }
}

impl fmt::Display for Pod<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.object, f)
    }
}
