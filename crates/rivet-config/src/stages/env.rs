use super::NormalizerStage;
use crate::NormalizeOptions;
use rivet_core::BuildConfig;
use serde_json::Value;

/// Splits `env: {global: ..., matrix: ...}` into its two sections.
///
/// `matrix` entries become `env` and fan out into jobs; `global` entries are
/// appended to `global_env` and apply to every job. A mapping without either
/// key is an ordinary var mapping and is left alone.
pub struct EnvExpansion;

impl NormalizerStage for EnvExpansion {
    fn name(&self) -> &'static str {
        "env"
    }

    fn run(&self, mut config: BuildConfig, _options: &NormalizeOptions) -> BuildConfig {
        let Some(Value::Object(env)) = config.get("env") else {
            return config;
        };
        if !env.contains_key("global") && !env.contains_key("matrix") {
            return config;
        }

        let Some(Value::Object(mut env)) = config.remove("env") else {
            return config;
        };

        if let Some(global) = env.shift_remove("global") {
            let mut global_env = as_list(config.remove("global_env"));
            global_env.extend(as_list(Some(global)));
            config.insert("global_env", Value::Array(global_env));
        }

        if let Some(matrix) = env.shift_remove("matrix") {
            config.insert("env", matrix);
        } else if !env.is_empty() {
            // Leftover vars next to `global` apply to every job as well.
            let mut global_env = as_list(config.remove("global_env"));
            global_env.push(Value::Object(env));
            config.insert("global_env", Value::Array(global_env));
        }

        config
    }
}

fn as_list(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(value: Value) -> BuildConfig {
        EnvExpansion.run(BuildConfig::from_value(value), &NormalizeOptions::default())
    }

    #[test]
    fn test_splits_global_and_matrix() {
        let result = run(json!({
            "env": { "global": ["CI=true", { "secure": "abc" }], "matrix": ["DB=pg", "DB=mysql"] }
        }));
        assert_eq!(
            result,
            BuildConfig::from_value(json!({
                "global_env": ["CI=true", { "secure": "abc" }],
                "env": ["DB=pg", "DB=mysql"]
            }))
        );
    }

    #[test]
    fn test_appends_to_existing_global_env() {
        let result = run(json!({ "global_env": "A=1", "env": { "global": "B=2" } }));
        assert_eq!(result.get("global_env"), Some(&json!(["A=1", "B=2"])));
        assert!(!result.contains_key("env"));
    }

    #[test]
    fn test_plain_var_mapping_is_untouched() {
        let input = json!({ "env": { "FOO": "bar", "BAZ": "qux" } });
        assert_eq!(run(input.clone()), BuildConfig::from_value(input));
    }

    #[test]
    fn test_list_env_is_untouched() {
        let input = json!({ "env": ["A=1", "A=2"] });
        assert_eq!(run(input.clone()), BuildConfig::from_value(input));
    }
}
