//! Kubernetes resources driven through kubectl

pub mod deployment;
pub mod job;
pub mod kubectl;
pub mod lifecycle;
pub mod object;
pub mod pod;

#[cfg(test)]
pub(crate) mod mock;

pub use deployment::{ContainerOverrides, Deployment, JobOptions};
pub use job::Job;
pub use kubectl::{Executor, FailurePolicy, Kubectl};
pub use lifecycle::RunToCompletion;
pub use object::{KubeObject, KubeResource};
pub use pod::Pod;
