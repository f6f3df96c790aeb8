//! Run a Pod or Job definition to completion

use super::{CommandContext, DefinitionSource};
use crate::k8s::job::Job;
use crate::k8s::lifecycle::RunToCompletion;
use crate::k8s::object::{KubeObject, KubeResource};
use crate::k8s::pod::Pod;
use crate::utils::polling::PollingConfig;
use crate::utils::progress::with_spinner_result;
use anyhow::{bail, Result};

/// Apply the definition and wait for it to finish, picking the lifecycle by kind
pub fn execute(ctx: &CommandContext, source: &DefinitionSource, polling: &PollingConfig) -> Result<()> {
    let object = KubeObject::new(source.load()?, &ctx.kubectl)?;
    let resource = object.to_string();
    crate::log_info!("Waiting up to {:?} for {}", polling.budget(), resource);

    let message = format!("Running {}", resource);
    let done = format!("{} completed", resource);

    let kind = object.kind().to_string();
    match kind.as_str() {
        k if k == Pod::KIND => {
            let pod = Pod::from_object(object);
            with_spinner_result(ctx.show_progress, &message, &done, || pod.execute(polling))?;
        }
        k if k == Job::KIND => {
            let job = Job::from_object(object);
            with_spinner_result(ctx.show_progress, &message, &done, || job.execute(polling))?;
        }
        other => bail!(
            "Cannot execute {}: only {} and {} run to completion",
            other,
            Pod::KIND,
            Job::KIND
        ),
    }

    crate::log_info!("{}", done);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;
    use std::io::Write;

    #[test]
    fn test_rejects_kinds_that_never_finish() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"kind: ConfigMap\nmetadata:\n  name: ${name}\n").unwrap();

        let mut settings = Settings::default();
        settings.kubectl.bin = "false".to_string();
        let ctx = CommandContext::new(settings, None, 1).unwrap();
        let source = DefinitionSource {
            file: file.path().to_path_buf(),
            params: [("name".to_string(), "app-config".to_string())].into(),
            anchors: None,
        };

        let err = execute(&ctx, &source, &PollingConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Cannot execute ConfigMap"));
    }
}
