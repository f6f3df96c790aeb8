//! Scripted executor for unit tests

use crate::k8s::kubectl::Executor;
use crate::utils::errors::{Error, Result};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub command: String,
    pub definition: Option<Value>,
}

impl Call {
    pub fn verb(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or("")
    }
}

/// Records every call and answers from per-verb scripts.
///
/// `get` pops queued documents, repeating the last one once the queue is
/// down to a single entry. Other verbs answer with their configured output,
/// or an empty success.
#[derive(Default)]
pub struct MockKubectl {
    calls: RefCell<Vec<Call>>,
    outputs: RefCell<HashMap<String, VecDeque<Vec<u8>>>>,
    failures: HashMap<String, String>,
}

impl MockKubectl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON document as the next answer for `verb`
    pub fn with_output(self, verb: &str, document: Value) -> Self {
        self.with_raw_output(verb, document.to_string().into_bytes())
    }

    pub fn with_raw_output(self, verb: &str, output: impl Into<Vec<u8>>) -> Self {
        self.outputs
            .borrow_mut()
            .entry(verb.to_string())
            .or_default()
            .push_back(output.into());
        self
    }

    /// Queue one `get` answer per status block, wrapped as a live object
    pub fn with_statuses(mut self, kind: &str, name: &str, statuses: Vec<Value>) -> Self {
        for status in statuses {
            self = self.with_output(
                "get",
                serde_json::json!({
                    "kind": kind,
                    "metadata": {"name": name},
                    "status": status,
                }),
            );
        }
        self
    }

    /// Make every call of `verb` exit non-zero with `output`
    pub fn failing_with(mut self, verb: &str, output: &str) -> Self {
        self.failures.insert(verb.to_string(), output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, verb: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.verb() == verb).count()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.command.clone()).collect()
    }
}

impl Executor for MockKubectl {
    fn run(&self, command: &str, definition: Option<&Value>) -> Result<Vec<u8>> {
        let call = Call {
            command: command.to_string(),
            definition: definition.cloned(),
        };
        let verb = call.verb().to_string();
        self.calls.borrow_mut().push(call);

        if let Some(output) = self.failures.get(&verb) {
            return Err(Error::Executor {
                command: format!("kubectl {}", command),
                code: Some(1),
                output: output.clone(),
            });
        }

        let mut outputs = self.outputs.borrow_mut();
        let queue = outputs.entry(verb).or_default();
        let output = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(output.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::kubectl::FailurePolicy;
    use serde_json::json;

    #[test]
    fn test_mock_records_tolerated_calls() {
        let mock = MockKubectl::new().failing_with("delete", "boom");
        let definition = json!({"kind": "Pod", "metadata": {"name": "x"}});

        assert!(mock.delete(&definition, FailurePolicy::Tolerate).is_ok());
        assert!(mock.delete(&definition, FailurePolicy::Propagate).is_err());
        assert_eq!(mock.count("delete"), 2);
        assert_eq!(mock.calls()[0].definition.as_ref(), Some(&definition));
    }

    #[test]
    fn test_last_queued_output_repeats() {
        let mock = MockKubectl::new()
            .with_raw_output("get", "first")
            .with_raw_output("get", "last");

        assert_eq!(mock.run("get -o json", None).unwrap(), b"first");
        assert_eq!(mock.run("get -o json", None).unwrap(), b"last");
        assert_eq!(mock.run("get -o json", None).unwrap(), b"last");
    }
}
