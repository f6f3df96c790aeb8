//! Deployments: rollout with automatic undo, and one-off workloads spawned
//! from the deployment's pod template

use crate::k8s::job::Job;
use crate::k8s::kubectl::FailurePolicy;
use crate::k8s::lifecycle::{status_of, RunToCompletion};
use crate::k8s::object::{KubeObject, KubeResource};
use crate::k8s::pod::Pod;
use crate::utils::errors::{Error, Result};
use crate::utils::polling::{PollOutcome, PollingConfig};
use k8s_openapi::api::apps::v1::DeploymentStatus;
use k8s_openapi::api::batch::v1::{Job as JobManifest, JobSpec};
use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{json, Map, Value};
use std::fmt;
use uuid::Uuid;

const SUFFIX_LEN: usize = 8;

/// Changes applied to the first container of a spawned pod
#[derive(Debug, Clone, Default)]
pub struct ContainerOverrides {
    /// Replaces the container command when set
    pub command: Option<Vec<String>>,
    /// Extra container-level fields, merged over the template's
    pub fields: Map<String, Value>,
}

/// Settings for jobs spawned from a deployment
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub ttl_seconds_after_finished: i32,
    pub backoff_limit: i32,
    /// Extra container-level fields
    pub fields: Map<String, Value>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            ttl_seconds_after_finished: 30,
            backoff_limit: 0,
            fields: Map::new(),
        }
    }
}

#[derive(Debug)]
pub struct Deployment<'a> {
    object: KubeObject<'a>,
}

impl<'a> KubeResource<'a> for Deployment<'a> {
    const KIND: &'static str = "Deployment";

    fn from_object(object: KubeObject<'a>) -> Self {
        Self { object }
    }

    fn object(&self) -> &KubeObject<'a> {
        &self.object
    }
}

impl fmt::Display for Deployment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.object, f)
    }
}

impl<'a> Deployment<'a> {
    /// Roll back to the previous revision
    pub fn undo(&self, policy: FailurePolicy) -> Result<()> {
        tracing::warn!(resource = %self, "rolling back last deployment");
        let command = format!(
            "rollout undo {}",
            shell_words::quote(&format!("deployment/{}", self.object.name()))
        );
        self.object.execute_scoped(&command, policy).map(|_| ())
    }

    /// Apply the definition and wait until at least one updated replica is
    /// available. When the budget runs out the rollout is undone.
    pub fn deploy(&self, polling: &PollingConfig) -> Result<()> {
        let span = tracing::info_span!("deploy", resource = %self);
        let _enter = span.enter();

        tracing::info!("deployment initiated");
        self.apply(FailurePolicy::Propagate)?;

        let outcome = polling.poll(|attempt| {
            let outcome = Self::rollout_outcome(&self.get()?)?;
            if !outcome.is_terminal() {
                tracing::info!(attempt, "waiting for first pod to be deployed...");
            }
            Ok(outcome)
        })?;

        if outcome == PollOutcome::Succeeded {
            tracing::info!("successfully deployed");
            return Ok(());
        }

        self.undo(FailurePolicy::Tolerate)?;
        Err(Error::DeploymentTimeout {
            resource: self.to_string(),
            attempts: polling.max_attempts,
        })
    }

    fn rollout_outcome(live: &Value) -> Result<PollOutcome> {
        let status: DeploymentStatus = status_of(live)?;
        let available = status.available_replicas.unwrap_or(0);
        let updated = status.updated_replicas.unwrap_or(0);

        Ok(if available > 0 && updated > 0 {
            PollOutcome::Succeeded
        } else {
            PollOutcome::Pending
        })
    }

    /// Deep copy of `spec.template.spec`
    pub fn pod_spec(&self) -> Result<Value> {
        self.object
            .definition()
            .pointer("/spec/template/spec")
            .filter(|spec| spec.is_object())
            .cloned()
            .ok_or_else(|| {
                Error::MalformedDefinition(format!("{} has no `spec.template.spec`", self))
            })
    }

    fn spawned_metadata(&self, task: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(unique_name(&format!("{}-{}", self.object.name(), task))),
            namespace: self.object.namespace().map(str::to_string),
            ..Default::default()
        }
    }

    /// Build a pod that runs the deployment's template once, never restarting
    pub fn one_off_pod(&self, task: &str, overrides: &ContainerOverrides) -> Result<Pod<'a>> {
        let mut spec = self.pod_spec()?;
        spec["restartPolicy"] = json!("Never");

        let container = first_container_mut(&mut spec, &self.object)?;
        if let Some(command) = &overrides.command {
            container.insert("command".to_string(), json!(command));
        }
        container.extend(overrides.fields.clone());

        let definition = json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": self.spawned_metadata(task),
            "spec": spec,
        });

        Pod::new(definition, self.object.kubectl())
    }

    /// Spawn a one-off pod and wait for it to finish
    pub fn run_pod(
        &self,
        task: &str,
        overrides: &ContainerOverrides,
        polling: &PollingConfig,
    ) -> Result<()> {
        let pod = self.one_off_pod(task, overrides)?;
        tracing::info!(resource = %self, pod = %pod, "spawned one-off pod");
        pod.execute(polling)
    }

    /// Build a job running `command` with the template's image and environment
    pub fn job(&self, task: &str, command: Vec<String>, options: &JobOptions) -> Result<Job<'a>> {
        let spec = self.pod_spec()?;
        let template = spec
            .pointer("/containers/0")
            .ok_or_else(|| Error::MalformedDefinition(format!("{} has no containers", self)))?;

        let image = template
            .get("image")
            .and_then(Value::as_str)
            .map(str::to_string);
        let env = template
            .get("env")
            .cloned()
            .map(serde_json::from_value::<Vec<EnvVar>>)
            .transpose()
            .map_err(|e| Error::parse(format!("env of {}", self), e))?;

        let manifest = JobManifest {
            metadata: self.spawned_metadata(task),
            spec: Some(JobSpec {
                ttl_seconds_after_finished: Some(options.ttl_seconds_after_finished),
                backoff_limit: Some(options.backoff_limit),
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: task.to_string(),
                            image,
                            env,
                            command: Some(command),
                            ..Default::default()
                        }],
                        restart_policy: Some("Never".to_string()),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut definition =
            serde_json::to_value(&manifest).map_err(|e| Error::parse("job manifest", e))?;
        if !options.fields.is_empty() {
            let mut pod_spec = definition["spec"]["template"]["spec"].take();
            first_container_mut(&mut pod_spec, &self.object)?.extend(options.fields.clone());
            definition["spec"]["template"]["spec"] = pod_spec;
        }

        Job::new(definition, self.object.kubectl())
    }

    /// Spawn a job and wait for it to finish
    pub fn run_job(
        &self,
        task: &str,
        command: Vec<String>,
        options: &JobOptions,
        polling: &PollingConfig,
    ) -> Result<()> {
        let job = self.job(task, command, options)?;
        tracing::info!(resource = %self, job = %job, "spawned job");
        job.execute(polling)
    }
}

fn first_container_mut<'v>(
    spec: &'v mut Value,
    owner: &KubeObject<'_>,
) -> Result<&'v mut Map<String, Value>> {
    spec.pointer_mut("/containers/0")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| Error::MalformedDefinition(format!("{} has no containers", owner)))
}

/// `base` plus a random 8-character suffix
pub fn unique_name(base: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", base, &id[..SUFFIX_LEN])
}
