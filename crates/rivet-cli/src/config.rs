//! CLI configuration: queue definitions and feature flags.

use anyhow::{Context, Result};
use rivet_core::StaticFeatures;
use rivet_scheduler::QueueSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default location of the CLI configuration.
pub const DEFAULT_CONFIG_PATH: &str = "rivet.yml";

/// Contents of `rivet.yml`.
///
/// Queue settings sit at the top level next to a `features` section:
///
/// ```yaml
/// default_queue: builds.linux
/// queues:
///   - queue: builds.docker
///     sudo: false
/// features:
///   education: true
///   owners:
///     builds.docker: [travis-ci]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RivetConfig {
    #[serde(flatten)]
    pub queues: QueueSettings,
    #[serde(default)]
    pub features: StaticFeatures,
    #[serde(default)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl RivetConfig {
    /// Load configuration from file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
