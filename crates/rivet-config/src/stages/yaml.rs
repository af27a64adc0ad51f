use super::NormalizerStage;
use crate::NormalizeOptions;
use crate::keys::ENV_KEYS;
use rivet_core::BuildConfig;
use serde_json::{Map, Value};

/// Undoes YAML 1.1 typing surprises.
///
/// * `on:` parses as the boolean `true`, so a deploy section's `on` key
///   arrives as `"true"`.
/// * Unquoted versions parse as numbers (`rvm: 2.1`, `jdk: 8`); version keys
///   are turned back into strings.
pub struct YamlCorrection;

impl NormalizerStage for YamlCorrection {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn run(&self, mut config: BuildConfig, _options: &NormalizeOptions) -> BuildConfig {
        if let Some(deploy) = config.get_mut("deploy") {
            match deploy {
                Value::Object(map) => restore_on(map),
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        if let Value::Object(map) = item {
                            restore_on(map);
                        }
                    }
                }
                _ => {}
            }
        }

        for key in ENV_KEYS.iter().filter(|k| **k != "env") {
            if let Some(value) = config.get_mut(key) {
                stringify_numbers(value);
            }
        }

        config
    }
}

fn restore_on(map: &mut Map<String, Value>) {
    if let Some(value) = map.shift_remove("true")
        && !map.contains_key("on")
    {
        map.insert("on".to_string(), value);
    }
}

fn stringify_numbers(value: &mut Value) {
    match value {
        Value::Number(n) => *value = Value::String(n.to_string()),
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::Number(n) = item {
                    *item = Value::String(n.to_string());
                }
            }
        }
        _ => {}
    }
}
