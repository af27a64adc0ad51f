use super::NormalizerStage;
use crate::NormalizeOptions;
use crate::keys::language_of;
use rivet_core::BuildConfig;
use rivet_core::config::first_str;
use serde_json::Value;

/// Pins `os` to a single name when multi-OS builds are off.
pub struct OsDefaults;

impl NormalizerStage for OsDefaults {
    fn name(&self) -> &'static str {
        "os"
    }

    fn run(&self, mut config: BuildConfig, _options: &NormalizeOptions) -> BuildConfig {
        let os = match config.get("os").and_then(first_str) {
            Some(os) if !os.trim().is_empty() => os.trim().to_lowercase(),
            _ => default_os(language_of(&config)).to_string(),
        };
        config.insert("os", Value::String(os));
        config
    }
}

fn default_os(language: &str) -> &'static str {
    match language {
        "objective-c" => "osx",
        _ => "linux",
    }
}
