//! Normalizer stages.
//!
//! Each stage takes a canonical config and returns a canonical config. The
//! order matters: feature defaults and YAML corrections run before env and
//! language expansion, which read keys the earlier stages rewrite.

mod env;
mod features;
mod language;
mod os;
mod yaml;

pub use env::EnvExpansion;
pub use features::FeatureDefaults;
pub use language::LanguageDefaults;
pub use os::OsDefaults;
pub use yaml::YamlCorrection;

use crate::NormalizeOptions;
use rivet_core::BuildConfig;

/// A single normalization pass.
pub trait NormalizerStage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn run(&self, config: BuildConfig, options: &NormalizeOptions) -> BuildConfig;
}

/// The default pipeline for the given options.
///
/// `OsDefaults` only runs without multi-OS support; with it, `os` is left
/// alone so it can expand into the matrix.
pub fn default_stages(options: &NormalizeOptions) -> Vec<Box<dyn NormalizerStage>> {
    let mut stages: Vec<Box<dyn NormalizerStage>> = vec![
        Box::new(FeatureDefaults),
        Box::new(YamlCorrection),
        Box::new(EnvExpansion),
        Box::new(LanguageDefaults),
    ];
    if !options.multi_os {
        stages.push(Box::new(OsDefaults));
    }
    stages
}
