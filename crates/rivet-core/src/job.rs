//! Job and repository records consumed by the router.

use crate::config::BuildConfig;
use serde::{Deserialize, Serialize};

/// The account owning a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
    /// Whether the account is flagged as an education account.
    #[serde(default)]
    pub education: bool,
}

impl Owner {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            education: false,
        }
    }

    pub fn education(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            education: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner_name: String,
    pub name: String,
    pub owner: Owner,
}

impl Repository {
    /// Repository owned by an account whose login equals `owner_name`.
    pub fn new(owner_name: impl Into<String>, name: impl Into<String>) -> Self {
        let owner_name = owner_name.into();
        Self {
            owner: Owner::new(owner_name.clone()),
            owner_name,
            name: name.into(),
        }
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }

    /// `owner_name/name`.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }
}

/// A single build job: one row of the expanded matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub config: BuildConfig,
    pub repository: Repository,
}

impl Job {
    pub fn new(config: BuildConfig, repository: Repository) -> Self {
        Self { config, repository }
    }
}
