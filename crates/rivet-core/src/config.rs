//! Build configuration documents.
//!
//! A [`BuildConfig`] is the user-authored `.rivet.yml` after parsing: an
//! ordered mapping from canonical keys to arbitrary values. Keys are
//! canonicalized on the way in so that `language`, `:language` (a Ruby-style
//! symbol key) and `Language` all address the same entry.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A canonicalized build configuration mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BuildConfig(Map<String, Value>);

impl BuildConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from an arbitrary JSON value.
    ///
    /// Anything that is not a mapping (including `null`, i.e. a missing
    /// document) yields an empty configuration.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(canonicalize_map(map, true)),
            _ => Self::default(),
        }
    }

    /// Build a configuration from a parsed YAML value.
    pub fn from_yaml_value(value: serde_yaml::Value) -> Self {
        Self::from_value(yaml_to_json(value))
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: serde_yaml::Value = serde_yaml::from_str(source)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(Self::from_yaml_value(value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Insert a value under an already-canonical key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this configuration without the given keys.
    pub fn without(&self, keys: &[&str]) -> Self {
        let map = self
            .0
            .iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self(map)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for BuildConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(canonicalize_map(map, true))
    }
}

impl FromIterator<(String, Value)> for BuildConfig {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Map<String, Value>>())
    }
}

impl<'de> Deserialize<'de> for BuildConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Going through the YAML value model accepts non-string keys.
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        Ok(Self::from_yaml_value(raw))
    }
}

/// Canonical form of a mapping key.
///
/// A leading `:` is dropped at every depth. Top-level keys are additionally
/// trimmed and lowercased; nested keys keep their case because they carry
/// environment variable names.
pub fn canonical_key(raw: &str, top_level: bool) -> String {
    let key = raw.strip_prefix(':').unwrap_or(raw);
    if top_level {
        key.trim().to_lowercase()
    } else {
        key.to_string()
    }
}

/// Keys that collide after canonicalization keep the last value.
fn canonicalize_map(map: Map<String, Value>, top_level: bool) -> Map<String, Value> {
    let mut canonical = Map::with_capacity(map.len());
    for (raw, value) in map {
        let key = canonical_key(&raw, top_level);
        if canonical.contains_key(&key) {
            debug!(
                key = %key,
                raw = %raw,
                "Duplicate config key after canonicalization, keeping the last value"
            );
        }
        canonical.insert(key, canonicalize_value(value));
    }
    canonical
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(canonicalize_map(map, false)),
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_value).collect()),
        other => other,
    }
}

/// Convert a YAML value to JSON, stringifying non-string mapping keys.
pub fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => yaml_number(&n),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(n.to_string()))
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => s,
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Null => "null".to_string(),
        other => yaml_to_json(other).to_string(),
    }
}

/// The first string of a scalar-or-list value.
///
/// `"ruby"` and `["ruby", "python"]` both yield `"ruby"`.
pub fn first_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(first_str),
        _ => None,
    }
}

/// Whether a value has the exact `{secure: ...}` shape.
pub fn is_secure_entry(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.len() == 1 && map.contains_key("secure"))
}
