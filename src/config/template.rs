//! Definition templates: placeholder substitution and JSON/YAML parsing

use crate::utils::errors::{Error, Result};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// Named template parameters
pub type Params = BTreeMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|\{([_A-Za-z][_A-Za-z0-9]*)\}|([_A-Za-z][_A-Za-z0-9]*)|(\{[^}\n]*\}?)?)")
        .expect("placeholder pattern is valid")
});

// Holds the anchors document while it is parsed alongside the primary one
const ANCHORS_KEY: &str = "__kubectl_bridge_anchors__";

/// Replace `${name}` and `$name` placeholders; `$$` yields a literal `$`.
/// Any other `$` is an invalid placeholder.
pub fn substitute(text: &str, params: &Params) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replacement(text, &caps, params)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);

    Ok(out)
}

fn replacement(text: &str, caps: &Captures<'_>, params: &Params) -> Result<String> {
    if caps.get(1).is_some() {
        return Ok("$".to_string());
    }

    let Some(name) = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()) else {
        let start = caps.get(0).map_or(0, |m| m.start());
        return Err(Error::InvalidPlaceholder {
            text: caps.get(0).map_or("$", |m| m.as_str()).to_string(),
            line: text[..start].matches('\n').count() + 1,
        });
    };

    params
        .get(name)
        .cloned()
        .ok_or_else(|| Error::MissingParameter {
            name: name.to_string(),
        })
}

/// Read a template file and substitute its placeholders
pub fn render_definition(path: &Path, params: &Params) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    substitute(&text, params)
}

/// Parse a rendered definition, trying JSON first and YAML second
pub fn parse_definition(raw: &str) -> Result<Value> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => parse_yaml(raw)?,
    };
    ensure_mapping(value)
}

/// Parse a YAML definition whose aliases refer to anchors declared in a
/// separate `anchors` document.
pub fn parse_definition_with_anchors(raw: &str, anchors: &str) -> Result<Value> {
    // JSON has no aliases to resolve
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return ensure_mapping(value);
    }

    let body = raw
        .lines()
        .skip_while(|line| line.trim().is_empty() || line.trim_end() == "---")
        .collect::<Vec<_>>()
        .join("\n");
    let indented = anchors
        .lines()
        .filter(|line| line.trim_end() != "---")
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    let combined = format!("{}:\n{}\n{}\n", ANCHORS_KEY, indented, body);

    let mut value = ensure_mapping(parse_yaml(&combined)?)?;
    if let Some(map) = value.as_object_mut() {
        map.remove(ANCHORS_KEY);
    }
    Ok(value)
}

/// Render a template file and parse it into a definition
pub fn load_definition(path: &Path, params: &Params, anchors: Option<&Path>) -> Result<Value> {
    let raw = render_definition(path, params)?;
    match anchors {
        Some(anchors_path) => {
            let anchors = render_definition(anchors_path, params)?;
            parse_definition_with_anchors(&raw, &anchors)
        }
        None => parse_definition(&raw),
    }
}

fn parse_yaml(raw: &str) -> Result<Value> {
    let mut yaml: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|e| Error::parse("definition", e))?;
    yaml.apply_merge()
        .map_err(|e| Error::parse("definition merge keys", e))?;
    serde_json::to_value(yaml).map_err(|e| Error::parse("definition", e))
}

fn ensure_mapping(value: Value) -> Result<Value> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(Error::MalformedDefinition(
            "definition must be a mapping".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_both_placeholder_styles() {
        let out = substitute(
            "image: ${repo}/app:$tag",
            &params(&[("repo", "quay.io/acme"), ("tag", "v2")]),
        )
        .unwrap();
        assert_eq!(out, "image: quay.io/acme/app:v2");
    }

    #[test]
    fn test_substitute_escaped_dollar() {
        let out = substitute("cost: $$5 ${x}", &params(&[("x", "y")])).unwrap();
        assert_eq!(out, "cost: $5 y");
    }

    #[test]
    fn test_substitute_rejects_bare_dollar() {
        let err = substitute("echo $ 1", &Params::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidPlaceholder { ref text, line: 1 } if text == "$"));
    }

    #[test]
    fn test_substitute_missing_parameter() {
        let err = substitute("name: ${name}", &Params::new()).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { ref name } if name == "name"));
    }

    #[test]
    fn test_substitute_rejects_malformed_braces() {
        let err = substitute("kind: Pod\nname: ${app-name}", &Params::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidPlaceholder { ref text, line: 2 } if text == "${app-name}"));

        let err = substitute("name: ${ name }", &params(&[("name", "web")])).unwrap_err();
        assert!(matches!(err, Error::InvalidPlaceholder { ref text, .. } if text == "${ name }"));

        let err = substitute("name: ${name", &params(&[("name", "web")])).unwrap_err();
        assert!(matches!(err, Error::InvalidPlaceholder { .. }));
    }

    #[test]
    fn test_parse_json_definition() {
        let value = parse_definition(r#"{"kind": "Pod", "metadata": {"name": "a"}}"#).unwrap();
        assert_eq!(value["kind"], "Pod");
    }

    #[test]
    fn test_parse_yaml_definition_with_merge_keys() {
        let raw = r#"
kind: Deployment
metadata:
  name: web
  labels: &labels
    app: web
spec:
  selector:
    matchLabels:
      <<: *labels
      tier: front
"#;
        let value = parse_definition(raw).unwrap();
        assert_eq!(value["spec"]["selector"]["matchLabels"]["app"], "web");
        assert_eq!(value["spec"]["selector"]["matchLabels"]["tier"], "front");
    }

    #[test]
    fn test_parse_rejects_scalar_documents() {
        let err = parse_definition("just a string").unwrap_err();
        assert!(matches!(err, Error::MalformedDefinition(_)));
    }

    #[test]
    fn test_aliases_resolve_against_anchors_document() {
        let anchors = "container: &container\n  image: nginx:1.27\n  name: web\n";
        let raw = "---\nkind: Pod\nmetadata:\n  name: web\nspec:\n  containers:\n    - *container\n";

        let value = parse_definition_with_anchors(raw, anchors).unwrap();
        assert_eq!(value["spec"]["containers"][0]["image"], "nginx:1.27");
        assert!(value.get(ANCHORS_KEY).is_none());
    }

    #[test]
    fn test_json_definition_ignores_anchors_document() {
        let anchors = "container: &container\n  image: nginx:1.27\n";
        let raw = r#"{"kind": "Pod", "metadata": {"name": "web"}}"#;

        let value = parse_definition_with_anchors(raw, anchors).unwrap();
        assert_eq!(value["metadata"]["name"], "web");
        assert!(value.get(ANCHORS_KEY).is_none());
    }

    #[test]
    fn test_load_definition_from_file() {
        let mut template = tempfile::NamedTempFile::new().unwrap();
        template
            .write_all(b"kind: Job\nmetadata:\n  name: ${name}\n")
            .unwrap();

        let value = load_definition(template.path(), &params(&[("name", "migrate")]), None).unwrap();
        assert_eq!(value["metadata"]["name"], "migrate");
    }
}
