//! Drive `kubectl` to apply, poll and clean up Kubernetes workloads.
//!
//! Definitions are rendered from JSON or YAML templates, wrapped in typed
//! handles ([`Deployment`], [`Pod`], [`Job`]) and pushed through an
//! [`Executor`]. Lifecycle operations poll status until a terminal state and
//! clean up after failures.

pub mod commands;
pub mod config;
pub mod k8s;
pub mod utils;

pub use config::template::{load_definition, Params};
pub use k8s::{
    ContainerOverrides, Deployment, Executor, FailurePolicy, Job, JobOptions, KubeObject,
    KubeResource, Kubectl, Pod, RunToCompletion,
};
pub use utils::errors::{Error, Result};
pub use utils::polling::{PollOutcome, PollingConfig};
