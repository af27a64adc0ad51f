//! Execution-side config: secure values decrypted for the build worker.

use crate::env::{self, ENV_SECTIONS, EnvEntry};
use crate::policy::{SecurePolicy, filter_addons};
use crate::secure::SecureConfig;
use rivet_core::{BuildConfig, SecureCipher};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Marker prefixed to decrypted env entries so workers can hide them in logs.
pub const SECURE_MARKER: &str = "SECURE";

/// Produces the config a worker executes.
///
/// Env sections become lists of strings, with decrypted entries marked
/// `SECURE KEY=value`. The input config is never modified.
pub struct DecryptedConfig<'a> {
    secure: SecureConfig<'a>,
    policy: SecurePolicy,
}

impl<'a> DecryptedConfig<'a> {
    pub fn new(cipher: &'a dyn SecureCipher, policy: SecurePolicy) -> Self {
        Self {
            secure: SecureConfig::new(cipher),
            policy,
        }
    }

    pub fn decrypt(&self, config: &BuildConfig) -> BuildConfig {
        let mut config = config.without(&["source_key"]);

        for section in ENV_SECTIONS {
            if let Some(value) = config.get(section)
                && !value.is_null()
            {
                let entries = self.decrypt_env(value);
                config.insert(section, entries);
            }
        }

        if let Some(deploy) = config.remove("deploy") {
            let mut addons = match config.remove("addons") {
                Some(Value::Object(map)) => map,
                _ => Map::new(),
            };
            addons.insert("deploy".to_string(), deploy);
            config.insert("addons", Value::Object(addons));
        }

        if let Some(addons) = config.get("addons") {
            if self.policy.addons {
                let decrypted = self.secure.decrypt(addons);
                config.insert("addons", decrypted);
            } else {
                match filter_addons(addons) {
                    Some(kept) => {
                        config.insert("addons", kept);
                    }
                    None => {
                        config.remove("addons");
                    }
                }
            }
        }

        config
    }

    fn decrypt_env(&self, section: &Value) -> Value {
        let entries = env::entries(section).unwrap_or_default();

        let vars: Vec<Value> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                EnvEntry::Plain(vars) => Some(Value::String(vars)),
                EnvEntry::Secure(Value::String(ciphertext)) if self.policy.secure_env => {
                    match self.secure.decrypt_value(&ciphertext) {
                        Ok(plaintext) => {
                            Some(Value::String(format!("{} {}", SECURE_MARKER, plaintext)))
                        }
                        Err(e) => {
                            warn!(error = %e, "Secure env entry could not be decrypted, keeping it as is");
                            Some(Value::String(format!("{} {}", SECURE_MARKER, ciphertext)))
                        }
                    }
                }
                EnvEntry::Secure(_) => {
                    debug!("Dropping secure env entry");
                    None
                }
            })
            .collect();

        Value::Array(vars)
    }
}
