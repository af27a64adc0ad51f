//! Environment variable entries of a build config.
//!
//! `env` and `global_env` accept a single string, a var mapping, a secure
//! entry, or a list mixing all three.

use regex::Regex;
use rivet_core::config::is_secure_entry;
use serde_json::Value;
use std::sync::LazyLock;

/// Config sections holding environment variables.
pub const ENV_SECTIONS: [&str; 2] = ["env", "global_env"];

/// Display replacement for a secret value.
pub const REDACTED: &str = "[secure]";

static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\w+)=").expect("assignment pattern is valid"));

/// One entry of an env section.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvEntry {
    /// `KEY=value` assignments in plaintext.
    Plain(String),
    /// The value of a `{secure: ...}` entry.
    Secure(Value),
}

/// Split an env section into entries.
///
/// Returns `None` for `null`; `null` list items are skipped.
pub fn entries(section: &Value) -> Option<Vec<EnvEntry>> {
    match section {
        Value::Null => None,
        Value::Array(items) => Some(items.iter().filter_map(entry).collect()),
        other => Some(entry(other).into_iter().collect()),
    }
}

fn entry(value: &Value) -> Option<EnvEntry> {
    match value {
        Value::Null => None,
        Value::Object(map) if is_secure_entry(value) => {
            Some(EnvEntry::Secure(map.get("secure").cloned().unwrap_or(Value::Null)))
        }
        Value::Object(map) => {
            let vars: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}={}", k, scalar(v)))
                .collect();
            Some(EnvEntry::Plain(vars.join(" ")))
        }
        Value::String(s) => Some(EnvEntry::Plain(s.clone())),
        other => Some(EnvEntry::Plain(other.to_string())),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace every assigned value with [`REDACTED`], keeping the names.
///
/// `BAR=barbaz FOO="a b"` becomes `BAR=[secure] FOO=[secure]`. Input without
/// any assignment is redacted as a whole, so no part of a value survives.
///
/// As in a shell, an unquoted ` word=` inside a value starts a new
/// assignment: `PASS=a b=c` redacts to `PASS=[secure] b=[secure]`.
pub fn redact_assignments(vars: &str) -> String {
    let mut names = Vec::new();
    let mut pos = 0;

    while pos <= vars.len() {
        let Some(caps) = ASSIGNMENT.captures_at(vars, pos) else {
            break;
        };
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        names.push(name.as_str());
        pos = skip_quoted(vars, whole.end());
    }

    if names.is_empty() {
        return REDACTED.to_string();
    }

    names
        .iter()
        .map(|name| format!("{}={}", name, REDACTED))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Position just after a quoted value starting at `start`, or `start` itself
/// when the value is unquoted.
fn skip_quoted(vars: &str, start: usize) -> usize {
    let rest = &vars[start..];
    let Some(quote @ ('"' | '\'')) = rest.chars().next() else {
        return start;
    };

    let mut escaped = false;
    for (idx, c) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return start + idx + c.len_utf8();
        }
    }
    vars.len()
}
