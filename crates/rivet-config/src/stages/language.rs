use super::NormalizerStage;
use crate::NormalizeOptions;
use crate::keys::DEFAULT_LANG;
use rivet_core::BuildConfig;
use rivet_core::config::first_str;
use serde_json::Value;

/// Pins `language` to a single lowercase name, defaulting to Ruby.
pub struct LanguageDefaults;

impl NormalizerStage for LanguageDefaults {
    fn name(&self) -> &'static str {
        "language"
    }

    fn run(&self, mut config: BuildConfig, _options: &NormalizeOptions) -> BuildConfig {
        let language = config
            .get("language")
            .and_then(first_str)
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        config.insert("language", Value::String(language));
        config
    }
}
