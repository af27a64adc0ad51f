//! Secure config values for Rivet CI.
//!
//! Build configs may carry `{secure: <ciphertext>}` entries encrypted with the
//! repository's public key. This crate decrypts them for execution and
//! redacts them for display.

pub mod cipher;
pub mod decrypted;
pub mod env;
pub mod obfuscate;
pub mod policy;
pub mod secure;

pub use cipher::AgeCipher;
pub use decrypted::DecryptedConfig;
pub use obfuscate::Obfuscator;
pub use policy::{ALLOWED_ADDONS, SecurePolicy};
pub use secure::SecureConfig;
