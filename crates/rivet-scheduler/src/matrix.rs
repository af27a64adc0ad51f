//! Matrix expansion of a build into jobs.

use rivet_config::NormalizeOptions;
use rivet_config::keys::matrix_keys_for;
use rivet_core::BuildConfig;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// A single job in an expanded matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixJob {
    /// Position in the build, starting at 1.
    pub number: usize,
    pub config: BuildConfig,
    pub allow_failure: bool,
    /// The matrix values of this job, in matrix-key order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<(String, Value)>,
}

impl MatrixJob {
    /// `rvm=2.1, env=DB=pg` style label, empty for a build without a matrix.
    pub fn display_name(&self) -> String {
        self.variables
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    _ => v.to_string(),
                };
                format!("{}={}", k, v)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of matrix expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixExpansion {
    pub jobs: Vec<MatrixJob>,
    /// Finish the build as soon as every required job has a result.
    pub fast_finish: bool,
}

/// Expands a normalized build config into one job per matrix row.
pub struct MatrixExpander {
    options: NormalizeOptions,
}

impl MatrixExpander {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    /// Expand a normalized config.
    ///
    /// Rows are the cross product of the matrix keys present in the config;
    /// `matrix.exclude`, `matrix.include` and `matrix.allow_failures` then
    /// refine them.
    pub fn expand(&self, config: &BuildConfig) -> MatrixExpansion {
        let keys = matrix_keys_for(config, &self.options);
        let settings = MatrixSettings::from_config(config);

        let dimensions: Vec<(&str, Vec<Value>)> = keys
            .iter()
            .filter_map(|key| {
                let values = match config.get(key)? {
                    Value::Array(items) if items.is_empty() => return None,
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                Some((*key, values))
            })
            .collect();

        let mut rows: Vec<Vec<(String, Value)>> = self
            .generate_combinations(&dimensions)
            .into_iter()
            .filter(|row| {
                !settings
                    .exclude
                    .iter()
                    .any(|exclude| self.matches_entry(row, exclude))
            })
            .collect();

        for include in &settings.include {
            let row: Vec<(String, Value)> = include.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            if !rows.iter().any(|existing| same_row(existing, &row)) {
                rows.push(row);
            }
        }

        let jobs: Vec<MatrixJob> = rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                let allow_failure = settings
                    .allow_failures
                    .iter()
                    .any(|entry| self.matches_entry(&row, entry));
                MatrixJob {
                    number: idx + 1,
                    config: self.job_config(config, &keys, &row),
                    allow_failure,
                    variables: row,
                }
            })
            .collect();

        debug!(
            jobs = jobs.len(),
            dimensions = dimensions.len(),
            "Expanded build matrix"
        );

        MatrixExpansion {
            jobs,
            fast_finish: settings.fast_finish,
        }
    }

    fn generate_combinations(&self, dimensions: &[(&str, Vec<Value>)]) -> Vec<Vec<(String, Value)>> {
        let mut result = vec![Vec::new()];

        for (key, values) in dimensions {
            let mut new_result = Vec::with_capacity(result.len() * values.len());

            for combo in &result {
                for value in values {
                    let mut new_combo = combo.clone();
                    new_combo.push((key.to_string(), value.clone()));
                    new_result.push(new_combo);
                }
            }

            result = new_result;
        }

        result
    }

    /// Whether every key of `entry` has the same value in `row`.
    fn matches_entry(&self, row: &[(String, Value)], entry: &Map<String, Value>) -> bool {
        !entry.is_empty()
            && entry
                .iter()
                .all(|(key, value)| row.iter().any(|(k, v)| k == key && v == value))
    }

    /// The config's non-matrix keys merged with a row's values.
    fn job_config(&self, config: &BuildConfig, keys: &[&str], row: &[(String, Value)]) -> BuildConfig {
        let mut job = BuildConfig::new();
        for (key, value) in config.iter() {
            if key == "matrix" || keys.iter().any(|k| *k == key) {
                continue;
            }
            job.insert(key, value.clone());
        }
        for (key, value) in row {
            job.insert(key.clone(), value.clone());
        }
        job
    }
}

/// The `matrix` section of a config.
#[derive(Debug, Default)]
struct MatrixSettings {
    include: Vec<Map<String, Value>>,
    exclude: Vec<Map<String, Value>>,
    allow_failures: Vec<Map<String, Value>>,
    fast_finish: bool,
}

impl MatrixSettings {
    fn from_config(config: &BuildConfig) -> Self {
        let Some(Value::Object(matrix)) = config.get("matrix") else {
            return Self::default();
        };

        Self {
            include: entries(matrix.get("include")),
            exclude: entries(matrix.get("exclude")),
            allow_failures: entries(matrix.get("allow_failures")),
            fast_finish: matches!(matrix.get("fast_finish"), Some(Value::Bool(true))),
        }
    }
}

/// Rows with the same key/value pairs, in any order.
fn same_row(a: &[(String, Value)], b: &[(String, Value)]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.iter().any(|(k, v)| k == key && v == value))
}

/// A mapping or list of mappings; anything else is ignored.
fn entries(value: Option<&Value>) -> Vec<Map<String, Value>> {
    match value {
        Some(Value::Object(map)) => vec![map.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

impl Default for MatrixExpander {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(value: Value) -> BuildConfig {
        BuildConfig::from_value(value)
    }

    fn labels(expansion: &MatrixExpansion) -> Vec<String> {
        expansion.jobs.iter().map(|j| j.display_name()).collect()
    }

    #[test]
    fn test_matrix_expansion() {
        let expansion = MatrixExpander::default().expand(&config(json!({
            "language": "ruby",
            "rvm": ["2.0", "2.1"],
            "gemfile": ["Gemfile", "Gemfile.rails4"],
            "env": ["DB=pg", "DB=mysql"],
            "script": "rake"
        })));

        assert_eq!(expansion.jobs.len(), 8); // 2 rvm × 2 gemfile × 2 env
        assert!(!expansion.fast_finish);
        assert_eq!(
            expansion.jobs[0].config,
            config(json!({
                "language": "ruby",
                "script": "rake",
                "gemfile": "Gemfile",
                "rvm": "2.0",
                "env": "DB=pg"
            }))
        );
        assert_eq!(expansion.jobs[0].display_name(), "gemfile=Gemfile, rvm=2.0, env=DB=pg");
        assert_eq!(
            expansion.jobs.iter().map(|j| j.number).collect::<Vec<_>>(),
            (1..=8).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_without_matrix_keys_yields_one_job() {
        let input = config(json!({ "language": "ruby", "script": "rake" }));
        let expansion = MatrixExpander::default().expand(&input);

        assert_eq!(expansion.jobs.len(), 1);
        assert_eq!(expansion.jobs[0].config, input);
        assert_eq!(expansion.jobs[0].display_name(), "");
    }

    #[test]
    fn test_scalar_key_is_a_single_row() {
        let expansion = MatrixExpander::default().expand(&config(json!({
            "rvm": "2.1",
            "env": ["A=1", "A=2"]
        })));
        assert_eq!(labels(&expansion), vec!["rvm=2.1, env=A=1", "rvm=2.1, env=A=2"]);
    }

    #[test]
    fn test_matrix_with_exclude() {
        let expansion = MatrixExpander::default().expand(&config(json!({
            "rvm": ["2.0", "2.1"],
            "env": ["A=1", "A=2"],
            "matrix": { "exclude": [{ "rvm": "2.0", "env": "A=2" }] }
        })));

        // 2x2 = 4, minus 1 excluded = 3
        assert_eq!(
            labels(&expansion),
            vec!["rvm=2.0, env=A=1", "rvm=2.1, env=A=1", "rvm=2.1, env=A=2"]
        );
        assert!(expansion.jobs.iter().all(|j| !j.config.contains_key("matrix")));
    }

    #[test]
    fn test_matrix_with_include() {
        let expansion = MatrixExpander::default().expand(&config(json!({
            "script": "rake",
            "rvm": ["2.1"],
            "matrix": { "include": [{ "rvm": "jruby", "env": "JRUBY_OPTS=--dev" }, { "rvm": "2.1" }] }
        })));

        assert_eq!(expansion.jobs.len(), 2);
        assert_eq!(
            expansion.jobs[1].config,
            config(json!({ "script": "rake", "rvm": "jruby", "env": "JRUBY_OPTS=--dev" }))
        );
        assert_eq!(expansion.jobs[1].number, 2);
    }

    #[test]
    fn test_include_matching_existing_row_in_other_key_order() {
        let expansion = MatrixExpander::default().expand(&config(json!({
            "rvm": ["2.1"],
            "env": ["A=1"],
            "matrix": { "include": [{ "env": "A=1", "rvm": "2.1" }] }
        })));

        assert_eq!(labels(&expansion), vec!["rvm=2.1, env=A=1"]);
    }

    #[test]
    fn test_allow_failures_and_fast_finish() {
        let expansion = MatrixExpander::default().expand(&config(json!({
            "rvm": ["2.1", "ruby-head"],
            "matrix": { "allow_failures": [{ "rvm": "ruby-head" }], "fast_finish": true }
        })));

        assert!(expansion.fast_finish);
        assert_eq!(
            expansion.jobs.iter().map(|j| j.allow_failure).collect::<Vec<_>>(),
            vec![false, true]
        );
    }

    #[test]
    fn test_os_expands_only_with_multi_os() {
        let input = config(json!({ "language": "c", "compiler": ["gcc", "clang"], "os": ["linux", "osx"] }));

        assert_eq!(MatrixExpander::default().expand(&input).jobs.len(), 2);

        let multi = MatrixExpander::new(NormalizeOptions {
            multi_os: true,
            ..Default::default()
        });
        let expansion = multi.expand(&input);
        assert_eq!(expansion.jobs.len(), 4);
        assert_eq!(expansion.jobs[3].config.get("os"), Some(&json!("osx")));
    }

    #[test]
    fn test_empty_list_is_not_a_dimension() {
        let expansion = MatrixExpander::default().expand(&config(json!({ "rvm": [], "env": ["A=1"] })));
        assert_eq!(expansion.jobs.len(), 1);
        assert!(!expansion.jobs[0].config.contains_key("rvm"));
    }
}
