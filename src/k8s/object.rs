//! Resource handles binding a definition to cluster operations

use crate::config::template::{self, Params};
use crate::k8s::kubectl::{Executor, FailurePolicy};
use crate::utils::errors::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// One cluster object: its definition plus the executor that reaches the cluster
pub struct KubeObject<'a> {
    kind: String,
    name: String,
    namespace: Option<String>,
    definition: Value,
    kubectl: &'a dyn Executor,
}

impl<'a> KubeObject<'a> {
    /// Wrap `definition`, adopting whatever kind it declares
    pub fn new(definition: Value, kubectl: &'a dyn Executor) -> Result<Self> {
        Self::with_kind("", definition, kubectl)
    }

    /// Wrap `definition`, requiring its kind to equal `expected`.
    /// An empty `expected` accepts any kind.
    pub fn with_kind(expected: &str, definition: Value, kubectl: &'a dyn Executor) -> Result<Self> {
        if !definition.is_object() {
            return Err(Error::MalformedDefinition(
                "definition must be a mapping".to_string(),
            ));
        }

        let kind = definition
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedDefinition("missing `kind`".to_string()))?;

        if !expected.is_empty() && kind != expected {
            return Err(Error::InvalidKind {
                expected: expected.to_string(),
                found: kind.to_string(),
            });
        }

        let name = definition
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::MalformedDefinition(format!("{} is missing `metadata.name`", kind))
            })?;

        let namespace = definition
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace,
            definition,
            kubectl,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn definition(&self) -> &Value {
        &self.definition
    }

    pub fn kubectl(&self) -> &'a dyn Executor {
        self.kubectl
    }

    /// Fetch the live object from the cluster
    pub fn get(&self) -> Result<Value> {
        self.kubectl.get(&self.definition)
    }

    pub fn apply(&self, policy: FailurePolicy) -> Result<()> {
        tracing::info!(resource = %self, "applying");
        self.kubectl.apply(&self.definition, policy)
    }

    pub fn delete(&self, policy: FailurePolicy) -> Result<()> {
        tracing::info!(resource = %self, "deleting");
        self.kubectl.delete(&self.definition, policy)
    }

    pub fn describe(&self, policy: FailurePolicy) -> Result<Option<String>> {
        self.kubectl.describe(&self.definition, policy)
    }

    /// Run a command that names the object itself rather than passing the
    /// definition, scoped to the object's namespace when it has one.
    pub(crate) fn execute_scoped(
        &self,
        command: &str,
        policy: FailurePolicy,
    ) -> Result<Option<Vec<u8>>> {
        let command = match &self.namespace {
            Some(ns) => format!("{} -n {}", command, shell_words::quote(ns)),
            None => command.to_string(),
        };
        self.kubectl.execute(&command, None, policy)
    }
}

impl fmt::Display for KubeObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.name)
    }
}

impl fmt::Debug for KubeObject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeObject")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// A resource type with a fixed kind, built on top of [`KubeObject`]
pub trait KubeResource<'a>: Sized {
    /// Kind required of the definition; empty accepts any
    const KIND: &'static str;

    fn from_object(object: KubeObject<'a>) -> Self;

    fn object(&self) -> &KubeObject<'a>;

    fn new(definition: Value, kubectl: &'a dyn Executor) -> Result<Self> {
        KubeObject::with_kind(Self::KIND, definition, kubectl).map(Self::from_object)
    }

    /// Render a template file and wrap the resulting definition
    fn from_file(
        path: &Path,
        params: &Params,
        anchors: Option<&Path>,
        kubectl: &'a dyn Executor,
    ) -> Result<Self> {
        let definition = template::load_definition(path, params, anchors)?;
        Self::new(definition, kubectl)
    }

    fn name<'s>(&'s self) -> &'s str
    where
        'a: 's,
    {
        self.object().name()
    }

    fn definition<'s>(&'s self) -> &'s Value
    where
        'a: 's,
    {
        self.object().definition()
    }

    fn get(&self) -> Result<Value> {
        self.object().get()
    }

    fn apply(&self, policy: FailurePolicy) -> Result<()> {
        self.object().apply(policy)
    }

    fn delete(&self, policy: FailurePolicy) -> Result<()> {
        self.object().delete(policy)
    }

    fn describe(&self, policy: FailurePolicy) -> Result<Option<String>> {
        self.object().describe(policy)
    }
}

impl<'a> KubeResource<'a> for KubeObject<'a> {
    const KIND: &'static str = "";

    fn from_object(object: KubeObject<'a>) -> Self {
        object
    }

    fn object(&self) -> &KubeObject<'a> {
        self
    }
}
