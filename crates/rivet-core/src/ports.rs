//! Collaborator traits.
//!
//! These traits define the interfaces between the routing/normalization core
//! and the services around it. Both are synchronous: a remote implementation
//! must resolve before returning.

use crate::Result;
use crate::job::Owner;

/// Feature-flag lookups consulted by the queue router.
pub trait FeatureFlags: Send + Sync {
    /// Whether `flag` is enabled for the given repository owner.
    fn owner_active(&self, flag: &str, owner: &Owner) -> bool;

    /// Whether routing of education accounts is globally enabled.
    fn education_active(&self) -> bool;
}

/// Asymmetric encryption of UTF-8 strings.
///
/// The ciphertext representation is opaque to callers; it only has to
/// survive being stored as a string in a build config.
pub trait SecureCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}
