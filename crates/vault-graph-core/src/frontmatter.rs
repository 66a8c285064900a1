//! Frontmatter splitting and key/value extraction.
//!
//! The leading `---` block is parsed as YAML with `serde_yaml` and
//! flattened into string scalars and string lists. Nested mappings are
//! dropped; an unparseable block yields an empty mapping. Schema
//! validation is left to other tools.

use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A single frontmatter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
}

/// Parsed frontmatter as an ordered key/value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Frontmatter {
    fields: BTreeMap<String, FrontmatterValue>,
}

impl Frontmatter {
    /// Parse the frontmatter block of `content`. Missing, unterminated, or
    /// invalid blocks yield an empty mapping.
    pub fn parse(content: &str) -> Self {
        let Some((yaml, _)) = split_frontmatter(content) else {
            return Self::default();
        };
        let mapping = match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Mapping(mapping)) => mapping,
            Ok(_) => return Self::default(),
            Err(e) => {
                log::debug!("unparseable frontmatter: {}", e);
                return Self::default();
            }
        };

        let fields = mapping
            .into_iter()
            .filter_map(|(key, value)| {
                let key = scalar_text(&key)?;
                let value = match value {
                    Value::Sequence(items) => match unquoted_wikilink(&items) {
                        Some(link) => FrontmatterValue::Scalar(link),
                        None => FrontmatterValue::List(
                            items.iter().filter_map(scalar_text).collect(),
                        ),
                    },
                    other => FrontmatterValue::Scalar(scalar_text(&other)?),
                };
                Some((key, value))
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&FrontmatterValue> {
        self.fields.get(key)
    }

    /// Scalar value for `key`; `None` for lists and missing keys.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FrontmatterValue::Scalar(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// List value for `key`. A scalar is treated as a one-element list.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(FrontmatterValue::List(items)) => items.clone(),
            Some(FrontmatterValue::Scalar(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FrontmatterValue)> {
        self.fields.iter()
    }
}

/// Split `content` into `(frontmatter_yaml, body)`. Returns `None` when the
/// content does not start with a terminated `---` block.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    if let Some(body) = rest.strip_prefix("---") {
        return Some(("", body.trim_start_matches(|c: char| c == '\r' || c == '\n')));
    }

    let close = rest.find("\n---")?;
    let yaml = &rest[..close];
    let after = &rest[close + 4..];
    let body = after.trim_start_matches(|c: char| c == '\r' || c == '\n');
    Some((yaml, body))
}

/// Text of a YAML scalar; `None` for mappings and sequences.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// `up: [[Home]]` written without quotes reads as a nested sequence.
fn unquoted_wikilink(items: &[Value]) -> Option<String> {
    match items {
        [Value::Sequence(inner)] => match inner.as_slice() {
            [Value::String(name)] => Some(format!("[[{}]]", name)),
            _ => None,
        },
        _ => None,
    }
}
