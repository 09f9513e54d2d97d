//! Loading OpenAPI documents into an ordered JSON tree.
//!
//! JSON and YAML sources both end up as a `serde_json::Value` with key order
//! preserved, so the walker reports locations in declaration order. Local
//! `$ref` targets are looked up on demand; external references are never
//! fetched.

use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;

use crate::error::{AuditError, Result};

/// A parsed API description together with its raw text.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name (file name, URL, or "stdin").
    pub name: String,
    pub root: Value,
    /// Raw text, used for best-effort line lookup.
    pub source: String,
}

impl Document {
    /// Parse a document from text. JSON is detected by a leading `{`.
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        let root = if source.trim_start().starts_with('{') {
            serde_json::from_str(&source).map_err(|e| AuditError::Parse(e.to_string()))?
        } else {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(&source).map_err(|e| AuditError::Parse(e.to_string()))?;
            yaml_to_json(yaml)
        };

        let is_openapi = root
            .as_object()
            .map(|m| m.contains_key("openapi") || m.contains_key("swagger"))
            .unwrap_or(false);
        if !is_openapi {
            return Err(AuditError::NotOpenApi(format!(
                "{} has no 'openapi' or 'swagger' field",
                name
            )));
        }

        Ok(Self { name, root, source })
    }

    /// Read and parse a document from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        Self::parse(path.to_string_lossy(), source)
    }

    /// The declared `openapi` or `swagger` version string.
    pub fn spec_version(&self) -> Option<&str> {
        self.root
            .get("openapi")
            .or_else(|| self.root.get("swagger"))
            .and_then(Value::as_str)
    }

    /// Look up a local reference such as `#/components/schemas/User`.
    /// Returns `None` for external references and missing targets.
    pub fn resolve_ref(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.root);
        }
        // serde_json pointers are unescaped per segment but not percent-decoded
        self.root.pointer(&percent_decode(pointer))
    }
}

/// Escape a key for use as a JSON-pointer segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Decode `%XX` escapes that URI-fragment pointers may carry.
fn percent_decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(b) = decoded {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Convert a YAML tree into JSON, stringifying non-string keys such as
/// unquoted response codes.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                map.insert(yaml_key(k), yaml_to_json(v));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
openapi: 3.0.3
info:
  title: Test
  version: "1"
paths:
  /users/{id}:
    get:
      responses:
        200:
          description: ok
components:
  schemas:
    Zeta:
      type: string
    Alpha:
      type: string
"#;

    #[test]
    fn test_parse_yaml_preserves_order_and_stringifies_keys() {
        let doc = Document::parse("test.yaml", YAML).unwrap();
        assert_eq!(doc.spec_version(), Some("3.0.3"));

        let names: Vec<&String> = doc.root["components"]["schemas"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);

        let responses = &doc.root["paths"]["/users/{id}"]["get"]["responses"];
        assert!(responses.get("200").is_some());
    }

    #[test]
    fn test_parse_json() {
        let doc = Document::parse("t.json", r#"{"swagger": "2.0", "paths": {}}"#).unwrap();
        assert_eq!(doc.spec_version(), Some("2.0"));
    }

    #[test]
    fn test_rejects_non_openapi() {
        let err = Document::parse("x.yaml", "name: hello").unwrap_err();
        assert!(matches!(err, AuditError::NotOpenApi(_)));

        let err = Document::parse("x.yaml", "a: [").unwrap_err();
        assert!(matches!(err, AuditError::Parse(_)));
    }

    #[test]
    fn test_resolve_ref() {
        let doc = Document::parse("test.yaml", YAML).unwrap();
        assert!(doc.resolve_ref("#/components/schemas/Alpha").is_some());
        assert!(doc.resolve_ref("#/paths/~1users~1{id}/get").is_some());
        assert!(doc.resolve_ref("#/paths/~1users~1%7Bid%7D/get").is_some());
        assert!(doc.resolve_ref("#/components/schemas/Missing").is_none());
        assert!(doc.resolve_ref("other.yaml#/components/schemas/Alpha").is_none());
    }

    #[test]
    fn test_escape_segment() {
        assert_eq!(escape_segment("/users/{id}"), "~1users~1{id}");
        assert_eq!(escape_segment("a~b"), "a~0b");
        assert_eq!(unescape_segment("~1users~0x"), "/users~x");
    }
}
