//! Rivet CI CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod handlers;

use commands::Commands;
use config::{DEFAULT_CONFIG_PATH, OutputFormat, RivetConfig};
use rivet_config::NormalizeOptions;

#[derive(Parser)]
#[command(name = "rivet")]
#[command(author, version, about = "Rivet CI build config tooling", long_about = None)]
struct Cli {
    /// Queue and feature-flag configuration
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Let `os` expand into the job matrix
    #[arg(long, global = true)]
    multi_os: bool,

    /// Let `dist` and `group` expand into the job matrix
    #[arg(long, global = true)]
    dist_group_expansion: bool,

    /// Output format, overriding the configuration file
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = RivetConfig::load(&cli.config)?;
    let ctx = handlers::Context {
        options: NormalizeOptions {
            multi_os: cli.multi_os,
            dist_group_expansion: cli.dist_group_expansion,
        },
        format: cli.format.unwrap_or(config.output_format),
        config,
    };

    match cli.command {
        Commands::Normalize { path } => handlers::normalize(&ctx, &path)?,
        Commands::Matrix { path } => handlers::matrix(&ctx, &path)?,
        Commands::Plan {
            path,
            repo,
            education,
        } => handlers::plan(&ctx, &path, &repo, education)?,
        Commands::Obfuscate { path, secure } => handlers::obfuscate(&ctx, &path, &secure)?,
        Commands::Decrypt { path, secure } => handlers::decrypt(&ctx, &path, &secure)?,
        Commands::Keygen { output } => handlers::keygen(output.as_deref())?,
        Commands::Encrypt { value, recipient } => handlers::encrypt(&ctx, &value, &recipient)?,
    }

    Ok(())
}
