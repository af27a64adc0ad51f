//! Structural decryption of `{secure: ...}` entries.

use rivet_core::config::is_secure_entry;
use rivet_core::{Result, SecureCipher};
use serde_json::Value;
use tracing::warn;

/// Decrypts secure entries anywhere in a config tree.
pub struct SecureConfig<'a> {
    cipher: &'a dyn SecureCipher,
}

impl<'a> SecureConfig<'a> {
    pub fn new(cipher: &'a dyn SecureCipher) -> Self {
        Self { cipher }
    }

    /// Replace every `{secure: ciphertext}` mapping with its plaintext.
    ///
    /// Lists and mappings are walked recursively, other values pass through.
    /// A ciphertext that fails to decrypt is returned unchanged: this cannot
    /// tell legacy plaintext apart from corrupt ciphertext.
    pub fn decrypt(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) if is_secure_entry(value) => match map.get("secure") {
                Some(Value::String(ciphertext)) => {
                    Value::String(self.decrypt_or_original(ciphertext))
                }
                Some(other) => other.clone(),
                None => Value::Null,
            },
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.decrypt(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.decrypt(v)).collect()),
            other => other.clone(),
        }
    }

    /// Decrypt a single ciphertext, surfacing failures.
    pub fn decrypt_value(&self, ciphertext: &str) -> Result<String> {
        self.cipher.decrypt(ciphertext)
    }

    /// Encrypt a value into the `{secure: ...}` shape.
    pub fn encrypt_entry(&self, plaintext: &str) -> Result<Value> {
        let ciphertext = self.cipher.encrypt(plaintext)?;
        Ok(serde_json::json!({ "secure": ciphertext }))
    }

    fn decrypt_or_original(&self, ciphertext: &str) -> String {
        match self.cipher.decrypt(ciphertext) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(error = %e, "Secure value could not be decrypted, keeping it as is");
                ciphertext.to_string()
            }
        }
    }
}
