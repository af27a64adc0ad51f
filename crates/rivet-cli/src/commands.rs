//! CLI command definitions.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Print the normalized form of a build config
    Normalize {
        /// Path to the build config
        #[arg(default_value = ".rivet.yml")]
        path: PathBuf,
    },

    /// Expand a build config into its job matrix
    Matrix {
        /// Path to the build config
        #[arg(default_value = ".rivet.yml")]
        path: PathBuf,
    },

    /// Expand a build config and route every job to a queue
    Plan {
        /// Path to the build config
        #[arg(default_value = ".rivet.yml")]
        path: PathBuf,

        /// Repository slug, `owner/name`
        #[arg(short, long)]
        repo: String,

        /// Treat the repository owner as an education account
        #[arg(long)]
        education: bool,
    },

    /// Print a build config with secure values redacted
    Obfuscate {
        /// Path to the build config
        #[arg(default_value = ".rivet.yml")]
        path: PathBuf,

        #[command(flatten)]
        secure: SecureArgs,
    },

    /// Print the config a worker would execute, secure values decrypted
    Decrypt {
        /// Path to the build config
        #[arg(default_value = ".rivet.yml")]
        path: PathBuf,

        #[command(flatten)]
        secure: SecureArgs,
    },

    /// Generate a repository key pair
    Keygen {
        /// Write the identity to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt a value for a repository's public key
    Encrypt {
        /// Value to encrypt, e.g. `TOKEN=abc`
        value: String,

        /// Repository public key (`age1...`)
        #[arg(short, long)]
        recipient: String,
    },
}

/// Key and provenance of the build whose secure values are read.
#[derive(Args)]
pub struct SecureArgs {
    /// Identity file holding the repository's private key
    #[arg(short, long)]
    pub identity: PathBuf,

    /// The build is a pull request
    #[arg(long)]
    pub pull_request: bool,

    /// The pull request comes from the same repository
    #[arg(long, requires = "pull_request")]
    pub same_repo: bool,
}
