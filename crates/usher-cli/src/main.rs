//! Usher CLI - headless companion for the usher playback controller
//!
//! Features:
//! - Catalog listing against a running media server
//! - Source-resolution dry runs (codec negotiation + manifest URL) without
//!   starting playback

use clap::{Parser, Subcommand};
use url::Url;

mod commands;

/// Usher CLI - adaptive-streaming playback toolkit
#[derive(Parser)]
#[command(name = "usher-cli")]
#[command(version)]
#[command(about = "Catalog and playback-source toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List playable files in the remote catalog
    List {
        /// Server address, e.g. http://localhost:8080/
        server: Url,
    },

    /// Resolve the playback source for a file without starting playback
    Resolve {
        /// Server address, e.g. http://localhost:8080/
        server: Url,

        /// File name as listed in the catalog
        name: String,

        /// Codec tag the local runtime can decode (repeatable)
        #[arg(short, long = "decodable")]
        decodable: Vec<String>,

        /// Resolve the transmuxed fallback manifest instead of negotiating
        #[arg(short, long)]
        transmuxed: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    tracing::debug!(verbose = cli.verbose, "Usher CLI starting");

    match cli.command {
        Commands::List { server } => commands::list(server).await,
        Commands::Resolve {
            server,
            name,
            decodable,
            transmuxed,
        } => commands::resolve(server, name, decodable, transmuxed).await,
    }
}
