//! Command handlers.

use crate::commands::SecureArgs;
use crate::config::{OutputFormat, RivetConfig};
use anyhow::{Context as _, Result, bail};
use console::style;
use rivet_config::{ConfigNormalizer, NormalizeOptions};
use rivet_core::{BuildConfig, Job, Owner, Repository};
use rivet_scheduler::{MatrixExpander, QueueRouter};
use rivet_secrets::{AgeCipher, DecryptedConfig, SecureConfig, SecurePolicy};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Settings shared by every command.
pub struct Context {
    pub config: RivetConfig,
    pub options: NormalizeOptions,
    pub format: OutputFormat,
}

impl Context {
    fn normalizer(&self) -> ConfigNormalizer {
        ConfigNormalizer::new(self.options)
    }

    /// Read and normalize a build config.
    fn load_build(&self, path: &Path) -> Result<BuildConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = BuildConfig::from_yaml_str(&content)
            .with_context(|| format!("Invalid build config in {}", path.display()))?;
        Ok(self.normalizer().normalize(raw))
    }

    fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", render(value, self.format)?);
        Ok(())
    }
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?.trim_end().to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
    })
}

/// Parse an `owner/name` slug.
fn parse_repo(slug: &str) -> Result<(&str, &str)> {
    match slug.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => bail!("Invalid repository slug {:?}, expected owner/name", slug),
    }
}

fn load_identity(path: &Path) -> Result<AgeCipher> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identity {}", path.display()))?;
    AgeCipher::from_identity_str(&contents)
        .with_context(|| format!("Invalid identity in {}", path.display()))
}

fn policy(args: &SecureArgs) -> SecurePolicy {
    SecurePolicy::for_build(args.pull_request, args.same_repo)
}

/// Print the normalized build config.
pub fn normalize(ctx: &Context, path: &Path) -> Result<()> {
    let config = ctx.load_build(path)?;
    ctx.print(&config)
}

/// Print the expanded job matrix.
pub fn matrix(ctx: &Context, path: &Path) -> Result<()> {
    let config = ctx.load_build(path)?;
    let expansion = MatrixExpander::new(ctx.options).expand(&config);
    ctx.print(&expansion)
}

#[derive(Serialize)]
struct PlannedJob {
    number: usize,
    queue: String,
    allow_failure: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    matrix: String,
}

/// Expand the build and print the queue of every job.
pub fn plan(ctx: &Context, path: &Path, repo: &str, education: bool) -> Result<()> {
    let (owner_name, name) = parse_repo(repo)?;
    let owner = if education {
        Owner::education(owner_name)
    } else {
        Owner::new(owner_name)
    };
    let repository = Repository::new(owner_name, name).with_owner(owner);

    let config = ctx.load_build(path)?;
    let expansion = MatrixExpander::new(ctx.options).expand(&config);
    let router = QueueRouter::new(
        Arc::new(ctx.config.queues.clone()),
        Arc::new(ctx.config.features.clone()),
    );

    let planned: Vec<PlannedJob> = expansion
        .jobs
        .into_iter()
        .map(|job| {
            let matrix = job.display_name();
            let queue = router.queue_for(&Job::new(job.config, repository.clone()));
            PlannedJob {
                number: job.number,
                queue: queue.name,
                allow_failure: job.allow_failure,
                matrix,
            }
        })
        .collect();

    info!(repo, jobs = planned.len(), "Planned build");
    ctx.print(&planned)
}

/// Print the build config as shown to untrusted viewers.
pub fn obfuscate(ctx: &Context, path: &Path, args: &SecureArgs) -> Result<()> {
    let cipher = load_identity(&args.identity)?;
    let config = ctx.load_build(path)?;
    let shown = ctx.normalizer().obfuscate(&config, &cipher, policy(args));
    ctx.print(&shown)
}

/// Print the build config as executed by a worker.
pub fn decrypt(ctx: &Context, path: &Path, args: &SecureArgs) -> Result<()> {
    let cipher = load_identity(&args.identity)?;
    let config = ctx.load_build(path)?;
    let decrypted = DecryptedConfig::new(&cipher, policy(args)).decrypt(&config);
    ctx.print(&decrypted)
}

/// Generate a key pair; the identity goes to `output` or stdout.
pub fn keygen(output: Option<&Path>) -> Result<()> {
    let cipher = AgeCipher::generate();
    let recipient = cipher.recipient();
    let Some(secret) = cipher.identity_string() else {
        bail!("Generated key has no identity");
    };
    let identity = format!("# public key: {}\n{}\n", recipient, secret);

    match output {
        Some(path) => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            std::fs::write(path, identity)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Wrote identity to {}", style("✓").green(), path.display());
            println!("{}", recipient);
        }
        None => print!("{}", identity),
    }
    Ok(())
}

/// Print a `secure:` entry for a value.
pub fn encrypt(ctx: &Context, value: &str, recipient: &str) -> Result<()> {
    let cipher = AgeCipher::from_recipient_str(recipient).context("Invalid recipient")?;
    let entry = SecureConfig::new(&cipher).encrypt_entry(value)?;
    ctx.print(&entry)
}
