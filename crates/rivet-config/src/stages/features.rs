use super::NormalizerStage;
use crate::NormalizeOptions;
use crate::keys::{EXPANSION_KEYS_DIST_GROUP, EXPANSION_KEYS_FEATURE};
use rivet_core::BuildConfig;
use serde_json::Value;

/// Pins keys of disabled features to a single value.
///
/// Without multi-OS support `os: [linux, osx]` would otherwise look like a
/// matrix dimension; the first entry is kept.
pub struct FeatureDefaults;

impl NormalizerStage for FeatureDefaults {
    fn name(&self) -> &'static str {
        "features"
    }

    fn run(&self, mut config: BuildConfig, options: &NormalizeOptions) -> BuildConfig {
        if !options.multi_os {
            for key in EXPANSION_KEYS_FEATURE {
                collapse(&mut config, key);
            }
        }
        if !options.dist_group_expansion {
            for key in EXPANSION_KEYS_DIST_GROUP {
                collapse(&mut config, key);
            }
        }
        config
    }
}

fn collapse(config: &mut BuildConfig, key: &str) {
    let first = match config.get(key) {
        Some(Value::Array(items)) => items.first().cloned(),
        _ => return,
    };
    match first {
        Some(value) if !value.is_null() => {
            config.insert(key, value);
        }
        _ => {
            config.remove(key);
        }
    }
}
