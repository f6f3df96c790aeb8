//! Kubectl wrapper utilities

use crate::utils::errors::{Error, Result};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

/// What to do when a kubectl invocation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the error to the caller
    Propagate,
    /// Log a warning and carry on with no output
    Tolerate,
}

/// Runs commands against the cluster.
///
/// Implementors provide [`Executor::run`]; failure tolerance and the
/// apply/delete/get/describe verbs are layered on top of it.
pub trait Executor {
    /// Run `command` (kubectl arguments, shell-quoted), passing `definition`
    /// as the `-f` payload when present. Returns raw stdout.
    fn run(&self, command: &str, definition: Option<&Value>) -> Result<Vec<u8>>;

    fn execute(
        &self,
        command: &str,
        definition: Option<&Value>,
        policy: FailurePolicy,
    ) -> Result<Option<Vec<u8>>> {
        match self.run(command, definition) {
            Ok(output) => Ok(Some(output)),
            Err(err) if policy == FailurePolicy::Tolerate => {
                tracing::warn!(command, error = %err, "command failed, swallowing");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn apply(&self, definition: &Value, policy: FailurePolicy) -> Result<()> {
        self.execute("apply", Some(definition), policy).map(|_| ())
    }

    fn delete(&self, definition: &Value, policy: FailurePolicy) -> Result<()> {
        self.execute("delete", Some(definition), policy).map(|_| ())
    }

    fn describe(&self, definition: &Value, policy: FailurePolicy) -> Result<Option<String>> {
        let output = self.execute("describe", Some(definition), policy)?;
        Ok(output.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Fetch the live object matching `definition`.
    ///
    /// Always yields a single object: list output is narrowed to its first item.
    fn get(&self, definition: &Value) -> Result<Value> {
        let resource = describe_definition(definition);
        let output = match self.run("get -o json", Some(definition)) {
            Ok(output) => output,
            Err(Error::Executor { output, .. }) if output.contains("(NotFound)") => {
                return Err(Error::NotFound { resource });
            }
            Err(err) => return Err(err),
        };

        let parsed: Value = serde_json::from_slice(&output)
            .map_err(|e| Error::parse(format!("kubectl get output for {}", resource), e))?;

        single_item(parsed).ok_or(Error::NotFound { resource })
    }
}

fn single_item(value: Value) -> Option<Value> {
    match value {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items.into_iter().next(),
            Some(other) => {
                map.insert("items".to_string(), other);
                Some(Value::Object(map))
            }
            None => Some(Value::Object(map)),
        },
        _ => None,
    }
}

fn describe_definition(definition: &Value) -> String {
    let kind = definition
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or("?");
    let name = definition
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or("?");
    format!("{}[{}]", kind, name)
}

/// The kubectl binary, invoked directly without a shell
#[derive(Debug, Clone)]
pub struct Kubectl {
    bin: String,
    global_flags: Vec<String>,
    kubeconfig: Option<PathBuf>,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl Kubectl {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            global_flags: Vec::new(),
            kubeconfig: None,
        }
    }

    /// Flags added to every invocation, e.g. `--context prod -n web`
    pub fn global_flags(mut self, flags: &str) -> Result<Self> {
        self.global_flags = shell_words::split(flags)
            .map_err(|e| Error::parse(format!("global flags `{}`", flags), e))?;
        Ok(self)
    }

    pub fn kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.bin.as_str())
            .chain(args.iter().map(String::as_str))
            .map(|arg| shell_words::quote(arg).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Executor for Kubectl {
    fn run(&self, command: &str, definition: Option<&Value>) -> Result<Vec<u8>> {
        let mut args = self.global_flags.clone();
        args.extend(
            shell_words::split(command)
                .map_err(|e| Error::parse(format!("command `{}`", command), e))?,
        );

        // Removed on drop, whichever way this function returns
        let payload = match definition {
            Some(definition) => {
                let mut file = tempfile::Builder::new()
                    .prefix("kubectl-bridge-")
                    .suffix(".json")
                    .tempfile()?;
                serde_json::to_writer(&mut file, definition)
                    .map_err(|e| Error::parse("definition payload", e))?;
                file.flush()?;
                args.push("-f".to_string());
                args.push(file.path().to_string_lossy().into_owned());
                Some(file)
            }
            None => None,
        };

        let command_line = self.command_line(&args);
        tracing::debug!(command = %command_line, "executing");

        let mut cmd = Command::new(&self.bin);
        if let Some(kc) = &self.kubeconfig {
            cmd.env("KUBECONFIG", kc);
        }
        cmd.args(&args);

        let output = cmd.output().map_err(|e| Error::Executor {
            command: command_line.clone(),
            code: None,
            output: e.to_string(),
        })?;
        drop(payload);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(Error::Executor {
                command: command_line,
                code: output.status.code(),
                output: format!("{}{}", stderr, stdout).trim_end().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::mock::MockKubectl;
    use serde_json::json;
    use std::path::Path;

    fn pod() -> Value {
        json!({"kind": "Pod", "metadata": {"name": "web"}})
    }

    #[test]
    fn test_run_passes_global_flags_and_command() {
        let kubectl = Kubectl::new("echo")
            .global_flags("--context 'prod cluster'")
            .unwrap();
        let output = kubectl.run("get pods -o name", None).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "--context prod cluster get pods -o name\n"
        );
    }

    #[test]
    fn test_payload_file_is_removed_after_run() {
        let kubectl = Kubectl::new("echo");
        let output = kubectl.run("apply", Some(&pod())).unwrap();
        let output = String::from_utf8(output).unwrap();

        let path = output
            .trim()
            .strip_prefix("apply -f ")
            .expect("payload path passed with -f");
        assert!(path.ends_with(".json"));
        assert!(!Path::new(path).exists());
    }

    #[test]
    fn test_payload_file_is_removed_after_failure() {
        let kubectl = Kubectl::new("sh")
            .global_flags("-c 'echo \"$3\" >&2; exit 3' sh")
            .unwrap();
        let err = kubectl.run("apply", Some(&pod())).unwrap_err();

        match err {
            Error::Executor { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert!(output.ends_with(".json"));
                assert!(!Path::new(&output).exists());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_nonzero_exit_is_executor_error() {
        let kubectl = Kubectl::new("false");
        let err = kubectl
            .execute("delete", Some(&pod()), FailurePolicy::Propagate)
            .unwrap_err();
        assert!(matches!(err, Error::Executor { code: Some(1), .. }));
    }

    #[test]
    fn test_tolerated_failure_returns_none() {
        let kubectl = Kubectl::new("false");
        let output = kubectl
            .execute("delete", Some(&pod()), FailurePolicy::Tolerate)
            .unwrap();
        assert!(output.is_none());
    }

    #[test]
    fn test_missing_binary_is_executor_error() {
        let kubectl = Kubectl::new("kubectl-bridge-no-such-binary");
        let err = kubectl.run("version", None).unwrap_err();
        assert!(matches!(err, Error::Executor { code: None, .. }));

        kubectl
            .apply(&pod(), FailurePolicy::Tolerate)
            .expect("tolerated apply never fails");
    }

    #[test]
    fn test_get_narrows_list_to_first_item() {
        let kubectl = MockKubectl::new().with_output(
            "get",
            json!({"kind": "List", "items": [{"kind": "Pod", "metadata": {"name": "web"}}]}),
        );
        let live = kubectl.get(&pod()).unwrap();
        assert_eq!(live["metadata"]["name"], "web");
    }

    #[test]
    fn test_get_single_object_is_returned_as_is() {
        let kubectl =
            MockKubectl::new().with_output("get", json!({"kind": "Pod", "status": {"phase": "Running"}}));
        let live = kubectl.get(&pod()).unwrap();
        assert_eq!(live["status"]["phase"], "Running");
    }

    #[test]
    fn test_get_empty_list_is_not_found() {
        let kubectl = MockKubectl::new().with_output("get", json!({"kind": "List", "items": []}));
        let err = kubectl.get(&pod()).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref resource } if resource == "Pod[web]"));
    }

    #[test]
    fn test_get_server_not_found_is_not_found() {
        let kubectl = MockKubectl::new().failing_with(
            "get",
            "Error from server (NotFound): pods \"web\" not found",
        );
        let err = kubectl.get(&pod()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_get_propagates_other_failures_unchanged() {
        let kubectl = MockKubectl::new().failing_with("get", "connection refused");
        let err = kubectl.get(&pod()).unwrap_err();
        assert!(matches!(err, Error::Executor { ref output, .. } if output == "connection refused"));
    }
}
