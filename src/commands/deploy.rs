//! Deployment commands: rollout, undo, and one-off pods and jobs

use super::{container_fields, CommandContext, DefinitionSource};
use crate::k8s::deployment::{ContainerOverrides, Deployment};
use crate::k8s::kubectl::FailurePolicy;
use crate::k8s::object::KubeResource;
use crate::utils::polling::PollingConfig;
use crate::utils::progress::with_spinner_result;
use anyhow::{Context, Result};

/// Options shared by `run` and `job`
pub struct SpawnOptions {
    pub task: String,
    pub command: Vec<String>,
    /// Raw `key=value` container fields
    pub set: Vec<(String, String)>,
}

/// Options for `job` on top of [`SpawnOptions`]
#[derive(Default)]
pub struct JobOverrides {
    pub ttl_seconds_after_finished: Option<i32>,
    pub backoff_limit: Option<i32>,
}

fn load<'a>(ctx: &'a CommandContext, source: &DefinitionSource) -> Result<Deployment<'a>> {
    let deployment = Deployment::new(source.load()?, &ctx.kubectl)
        .with_context(|| format!("{} is not a usable deployment", source.file.display()))?;
    Ok(deployment)
}

/// Apply a deployment and wait for the rollout, undoing it on timeout
pub fn deploy(ctx: &CommandContext, source: &DefinitionSource, polling: &PollingConfig) -> Result<()> {
    let deployment = load(ctx, source)?;
    crate::log_info!("Waiting up to {:?} for {}", polling.budget(), deployment);

    let message = format!("Rolling out {}", deployment);
    let done = format!("{} is available", deployment);
    with_spinner_result(ctx.show_progress, &message, &done, || deployment.deploy(polling))?;

    crate::log_info!("{}", done);
    Ok(())
}

pub fn undo(ctx: &CommandContext, source: &DefinitionSource) -> Result<()> {
    let deployment = load(ctx, source)?;
    deployment
        .undo(FailurePolicy::Propagate)
        .with_context(|| format!("Failed to roll back {}", deployment))?;
    crate::log_info!("{} rolled back", deployment);
    Ok(())
}

/// Spawn a pod from the deployment's template and wait for it
pub fn run_pod(
    ctx: &CommandContext,
    source: &DefinitionSource,
    spawn: SpawnOptions,
    polling: &PollingConfig,
) -> Result<()> {
    let deployment = load(ctx, source)?;
    let overrides = ContainerOverrides {
        command: (!spawn.command.is_empty()).then_some(spawn.command),
        fields: container_fields(&spawn.set),
    };

    let message = format!("Running {} from {}", spawn.task, deployment);
    let done = format!("{} finished", spawn.task);
    with_spinner_result(ctx.show_progress, &message, &done, || {
        deployment.run_pod(&spawn.task, &overrides, polling)
    })?;

    crate::log_info!("{}", done);
    Ok(())
}

/// Spawn a job from the deployment's image and environment and wait for it
pub fn run_job(
    ctx: &CommandContext,
    source: &DefinitionSource,
    spawn: SpawnOptions,
    overrides: JobOverrides,
    polling: &PollingConfig,
) -> Result<()> {
    let deployment = load(ctx, source)?;

    let mut options = ctx.settings.job_options();
    if let Some(ttl) = overrides.ttl_seconds_after_finished {
        options.ttl_seconds_after_finished = ttl;
    }
    if let Some(backoff) = overrides.backoff_limit {
        options.backoff_limit = backoff;
    }
    options.fields = container_fields(&spawn.set);

    let message = format!("Running job {} from {}", spawn.task, deployment);
    let done = format!("Job {} finished", spawn.task);
    with_spinner_result(ctx.show_progress, &message, &done, || {
        deployment.run_job(&spawn.task, spawn.command.clone(), &options, polling)
    })?;

    crate::log_info!("{}", done);
    Ok(())
}
