//! Static feature-flag set.

use crate::job::Owner;
use crate::ports::FeatureFlags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Feature flags loaded from configuration.
///
/// `owners` maps a flag name to the owner logins it is enabled for; the
/// login `*` enables a flag for every owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticFeatures {
    #[serde(default)]
    pub education: bool,
    #[serde(default)]
    pub owners: HashMap<String, Vec<String>>,
}

impl StaticFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a flag for one owner login.
    pub fn with_owner(mut self, flag: impl Into<String>, login: impl Into<String>) -> Self {
        self.owners.entry(flag.into()).or_default().push(login.into());
        self
    }

    /// Enable a flag for every owner.
    pub fn with_flag_for_all(self, flag: impl Into<String>) -> Self {
        self.with_owner(flag, "*")
    }

    pub fn with_education(mut self, active: bool) -> Self {
        self.education = active;
        self
    }
}

impl FeatureFlags for StaticFeatures {
    fn owner_active(&self, flag: &str, owner: &Owner) -> bool {
        self.owners
            .get(flag)
            .is_some_and(|logins| logins.iter().any(|l| l == "*" || *l == owner.login))
    }

    fn education_active(&self) -> bool {
        self.education
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_flags() {
        let features = StaticFeatures::new()
            .with_owner("builds.docker", "travis-ci")
            .with_flag_for_all("builds.cloudfoundry");

        assert!(features.owner_active("builds.docker", &Owner::new("travis-ci")));
        assert!(!features.owner_active("builds.docker", &Owner::new("rails")));
        assert!(features.owner_active("builds.cloudfoundry", &Owner::new("anyone")));
        assert!(!features.owner_active("unknown", &Owner::new("travis-ci")));
        assert!(!features.education_active());
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let features: StaticFeatures = serde_yaml::from_str(
            "education: true\nowners:\n  builds.docker: [travis-ci]\n",
        )
        .unwrap();
        assert!(features.education_active());
        assert!(features.owner_active("builds.docker", &Owner::new("travis-ci")));
    }
}
