mod cli;
mod http;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ebb::config::EbbConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ebb", version, about = "Fading knowledge graph server for AI agents")]
struct Cli {
    /// Config file (defaults to ~/.ebb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Start the MCP server (stdio transport)
    Mcp,
    /// Show graph statistics
    Stats,
    /// Search entities by substring
    Search {
        /// Case-insensitive text to look for
        query: String,
    },
    /// Show one entity with scored observations and relations
    Inspect {
        /// Exact entity name
        name: String,
        /// Also show expired observations and relations
        #[arg(long)]
        include_expired: bool,
    },
    /// Export the whole graph document as JSON
    Export,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => EbbConfig::load_from(path)?,
        None => EbbConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC and CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_http(config).await?,
        Command::Mcp => server::serve_stdio(config).await?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Search { query } => cli::search::search(&config, &query)?,
        Command::Inspect {
            name,
            include_expired,
        } => cli::inspect::inspect(&config, &name, include_expired)?,
        Command::Export => cli::export::export(&config)?,
    }

    Ok(())
}
