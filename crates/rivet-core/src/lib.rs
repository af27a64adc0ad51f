//! Rivet CI Core
//!
//! Core domain types, collaborator traits, and error handling for Rivet CI.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used by the config normalizer, the queue router and the secure-config
//! tooling.

pub mod config;
pub mod error;
pub mod features;
pub mod job;
pub mod ports;

pub use config::BuildConfig;
pub use error::{Error, Result};
pub use features::StaticFeatures;
pub use job::{Job, Owner, Repository};
pub use ports::{FeatureFlags, SecureCipher};
