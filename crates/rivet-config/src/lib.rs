//! Build config normalization for Rivet CI.
//!
//! A submitted `.rivet.yml` is canonicalized, run through an ordered pipeline
//! of normalizer stages, and then inspected for the keys that fan out into a
//! job matrix.

pub mod keys;
pub mod normalizer;
pub mod stages;

pub use keys::{DEFAULT_LANG, ENV_KEYS, LANGUAGES, language_keys};
pub use normalizer::{ConfigNormalizer, NormalizeOptions};
pub use stages::NormalizerStage;
