//! Display-safe rendering of build configs.

use crate::env::{self, ENV_SECTIONS, EnvEntry, REDACTED};
use crate::policy::{SecurePolicy, filter_addons};
use crate::secure::SecureConfig;
use rivet_core::{BuildConfig, SecureCipher};
use serde_json::Value;
use tracing::debug;

/// Renders a config for untrusted viewers.
///
/// Secure env entries are decrypted only to recover variable names; their
/// values are always replaced with `[secure]`. Nothing decrypted elsewhere in
/// the config is ever returned.
pub struct Obfuscator<'a> {
    secure: SecureConfig<'a>,
    policy: SecurePolicy,
}

impl<'a> Obfuscator<'a> {
    pub fn new(cipher: &'a dyn SecureCipher, policy: SecurePolicy) -> Self {
        Self {
            secure: SecureConfig::new(cipher),
            policy,
        }
    }

    pub fn obfuscate(&self, config: &BuildConfig) -> BuildConfig {
        let mut config = config.without(&["source_key"]);

        for section in ENV_SECTIONS {
            if let Some(value) = config.get(section) {
                let rendered = self.obfuscate_env(value);
                config.insert(section, rendered);
            }
        }

        if let Some(addons) = config.get("addons") {
            match filter_addons(addons) {
                Some(kept) => {
                    config.insert("addons", kept);
                }
                None => {
                    config.remove("addons");
                }
            }
        }

        config
    }

    /// Render an env section as a single space-separated string.
    fn obfuscate_env(&self, section: &Value) -> Value {
        let Some(entries) = env::entries(section) else {
            return Value::Null;
        };

        let rendered: Vec<String> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                EnvEntry::Plain(vars) => Some(vars),
                EnvEntry::Secure(value) if self.policy.secure_env => Some(self.redact(&value)),
                EnvEntry::Secure(_) => {
                    debug!("Dropping secure env entry, secure env disabled");
                    None
                }
            })
            .collect();

        if rendered.is_empty() {
            Value::Null
        } else {
            Value::String(rendered.join(" "))
        }
    }

    fn redact(&self, value: &Value) -> String {
        match value {
            Value::String(ciphertext) => match self.secure.decrypt_value(ciphertext) {
                Ok(plaintext) => env::redact_assignments(&plaintext),
                // Possibly legacy plaintext: redact it all the same.
                Err(_) => env::redact_assignments(ciphertext),
            },
            _ => REDACTED.to_string(),
        }
    }
}
