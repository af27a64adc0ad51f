//! Which secure material a build may see.

use serde_json::{Map, Value};

/// Addon sections that never carry credentials and survive filtering.
pub const ALLOWED_ADDONS: [&str; 8] = [
    "apt",
    "apt_packages",
    "apt_sources",
    "firefox",
    "hosts",
    "mariadb",
    "postgresql",
    "ssh_known_hosts",
];

/// Secure env and addon access for one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurePolicy {
    /// Secure env entries may be decrypted.
    pub secure_env: bool,
    /// Addon sections may be decrypted and passed through unfiltered.
    pub addons: bool,
}

impl SecurePolicy {
    /// Full access, for pushes and same-repository pull requests.
    pub fn trusted() -> Self {
        Self {
            secure_env: true,
            addons: true,
        }
    }

    /// No secure access, for pull requests from forks.
    pub fn untrusted() -> Self {
        Self::default()
    }

    /// Derive the policy from the build's provenance.
    pub fn for_build(pull_request: bool, same_repo_pull_request: bool) -> Self {
        if !pull_request || same_repo_pull_request {
            Self::trusted()
        } else {
            Self::untrusted()
        }
    }
}

/// Keep only allow-listed addon sections; `None` when `addons` is not a mapping.
pub fn filter_addons(addons: &Value) -> Option<Value> {
    let Value::Object(map) = addons else {
        return None;
    };
    let kept: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| ALLOWED_ADDONS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Some(Value::Object(kept))
}
