//! Error types for Rivet CI.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Document errors
    #[error("Invalid build config: {0}")]
    InvalidConfig(String),

    #[error("Invalid queue configuration: {0}")]
    InvalidQueueConfig(String),

    // Cipher errors
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("No private key available for decryption")]
    MissingKey,
}

pub type Result<T> = std::result::Result<T, Error>;
