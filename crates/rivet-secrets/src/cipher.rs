//! Repository key cipher backed by age (X25519).

use age::secrecy::ExposeSecret;
use age::x25519;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rivet_core::{Error, Result, SecureCipher};
use std::str::FromStr;
use tracing::debug;

/// Asymmetric cipher for secure config values.
///
/// Anyone holding the recipient (public key) can encrypt; only a cipher
/// built from the identity (private key) can decrypt. Ciphertext is the
/// binary age format, base64 encoded so it fits in a YAML string.
pub struct AgeCipher {
    recipient: x25519::Recipient,
    identity: Option<x25519::Identity>,
}

impl AgeCipher {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        Self::from_identity(x25519::Identity::generate())
    }

    pub fn from_identity(identity: x25519::Identity) -> Self {
        Self {
            recipient: identity.to_public(),
            identity: Some(identity),
        }
    }

    /// Parse an identity file's contents (`AGE-SECRET-KEY-1...`).
    ///
    /// Blank lines and `#` comments are skipped; the first key line wins.
    pub fn from_identity_str(contents: &str) -> Result<Self> {
        let line = contents
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .ok_or_else(|| Error::InvalidKey("no identity found".to_string()))?;

        let identity = x25519::Identity::from_str(line)
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self::from_identity(identity))
    }

    /// Encrypt-only cipher from a public recipient (`age1...`).
    pub fn from_recipient_str(recipient: &str) -> Result<Self> {
        let recipient = x25519::Recipient::from_str(recipient.trim())
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self {
            recipient,
            identity: None,
        })
    }

    /// The public key, shareable with repository owners.
    pub fn recipient(&self) -> String {
        self.recipient.to_string()
    }

    /// The private key, if this cipher can decrypt.
    pub fn identity_string(&self) -> Option<String> {
        self.identity
            .as_ref()
            .map(|identity| identity.to_string().expose_secret().to_string())
    }

    pub fn can_decrypt(&self) -> bool {
        self.identity.is_some()
    }
}

impl SecureCipher for AgeCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let ciphertext = age::encrypt(&self.recipient, plaintext.as_bytes())
            .map_err(|e| Error::Encryption(e.to_string()))?;
        debug!(bytes = ciphertext.len(), "Value encrypted");
        Ok(STANDARD.encode(ciphertext))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let identity = self.identity.as_ref().ok_or(Error::MissingKey)?;

        let bytes = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| Error::Decryption(format!("invalid base64: {}", e)))?;

        let plaintext =
            age::decrypt(identity, &bytes).map_err(|e| Error::Decryption(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::Decryption(format!("invalid UTF-8: {}", e)))
    }
}
