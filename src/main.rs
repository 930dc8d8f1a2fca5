//! `CommentPulse` CLI - analyse and monitor comment sentiment

mod cmd;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commentpulse::Config;

#[derive(Parser)]
#[command(name = "commentpulse")]
#[command(about = "Live comment sentiment analytics for video items")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/commentpulse/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, score and summarise the comments of one item
    Analyze {
        /// Video URL or 11-character id
        url: String,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Use synthetic data only (no network, in-memory store)
        #[arg(long)]
        offline: bool,
    },

    /// Serve live updates over WebSocket until Ctrl+C
    Monitor {
        /// Video URL or 11-character id
        url: String,

        /// Listen address (overrides [server].bind)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Score a piece of text and print the result as JSON
    Score {
        /// Text to score
        text: String,

        /// Keyword lexicon only
        #[arg(long)]
        lexical: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { url, json, offline } => {
            cmd::analyze::cmd_analyze(&config, &url, json, offline).await?;
        }
        Commands::Monitor { url, bind } => {
            cmd::monitor::cmd_monitor(&config, &url, bind).await?;
        }
        Commands::Score { text, lexical } => {
            cmd::score::cmd_score(&config, &text, lexical)?;
        }
    }

    Ok(())
}
