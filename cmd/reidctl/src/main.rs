//! reidctl - Operator CLI for the stray re-identification pipeline.

use clap::{Parser, Subcommand};

mod commands;

use commands::{ProfileCommand, SightingCommand};

/// Operator CLI for the stray re-identification pipeline.
///
/// Runs the full pipeline locally: profiles and sightings are kept in a
/// redb file, photo bytes on the filesystem, and embeddings come from the
/// external ML service.
#[derive(Parser)]
#[command(name = "reidctl")]
#[command(about = "Stray re-identification pipeline CLI")]
#[command(version)]
pub struct Cli {
    /// Data directory for the database and photo storage
    #[arg(long, global = true, default_value = "./strayid-data")]
    pub data: String,

    /// Base URL of the embedding service
    #[arg(long, global = true, default_value = "http://localhost:8000")]
    pub embed_url: String,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register and manage animal profiles
    Profile(ProfileCommand),
    /// Report sightings and work with match results
    Sighting(SightingCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .init();
    }

    match &cli.command {
        Commands::Profile(cmd) => cmd.run(&cli).await,
        Commands::Sighting(cmd) => cmd.run(&cli).await,
    }
}
