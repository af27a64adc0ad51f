//! The normalizer pipeline.

use crate::keys;
use crate::stages::{self, NormalizerStage};
use rivet_core::{BuildConfig, SecureCipher};
use rivet_secrets::{Obfuscator, SecurePolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

/// Feature switches that change normalization and matrix expansion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Allow `os` to fan out into the matrix instead of pinning it.
    pub multi_os: bool,
    /// Allow `dist` and `group` to fan out into the matrix.
    pub dist_group_expansion: bool,
}

/// Runs a raw build config through the stage pipeline.
pub struct ConfigNormalizer {
    options: NormalizeOptions,
    stages: Vec<Box<dyn NormalizerStage>>,
}

impl ConfigNormalizer {
    /// A normalizer with the default pipeline for `options`.
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            stages: stages::default_stages(&options),
            options,
        }
    }

    /// A normalizer with a custom pipeline.
    pub fn with_stages(options: NormalizeOptions, stages: Vec<Box<dyn NormalizerStage>>) -> Self {
        Self { options, stages }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Fold the config through every stage in order.
    ///
    /// Keys are already canonical: `BuildConfig` canonicalizes on
    /// construction.
    pub fn normalize(&self, config: BuildConfig) -> BuildConfig {
        let normalized = self.stages.iter().fold(config, |config, stage| {
            trace!(stage = stage.name(), "Running normalizer stage");
            stage.run(config, &self.options)
        });
        debug!(
            keys = normalized.len(),
            language = keys::language_of(&normalized),
            "Normalized build config"
        );
        normalized
    }

    /// Normalize an arbitrary document. Anything but a mapping is treated
    /// as an empty config.
    pub fn normalize_value(&self, value: Value) -> BuildConfig {
        self.normalize(BuildConfig::from_value(value))
    }

    /// The eligible matrix keys present in this config.
    pub fn matrix_keys_for(&self, config: &BuildConfig) -> Vec<&'static str> {
        keys::matrix_keys_for(config, &self.options)
    }

    /// Render a config for display, redacting secure values.
    pub fn obfuscate(
        &self,
        config: &BuildConfig,
        cipher: &dyn SecureCipher,
        policy: SecurePolicy,
    ) -> BuildConfig {
        Obfuscator::new(cipher, policy).obfuscate(config)
    }
}

impl Default for ConfigNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}
