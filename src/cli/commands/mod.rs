//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod export;
mod session;
mod stdio;
mod visible;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "eta-export")]
#[command(about = "Invoice export from the ETA e-invoicing portal")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// DevTools URL of a running browser (e.g. ws://localhost:9222)
    #[arg(long, global = true, env = "ETA_REMOTE_URL")]
    remote_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire every result page and write the records as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the records of the page currently displayed
    Visible {
        /// Read a saved page instead of the live tab
        #[arg(long)]
        html: Option<PathBuf>,
        /// URL the saved page was captured from
        #[arg(long, requires = "html")]
        url: Option<String>,
    },

    /// Serve JSON-lines requests on stdin, answering on stdout
    ServeStdio,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?,
        None => Config::load().await,
    };
    if let Some(remote_url) = cli.remote_url {
        config.browser.remote_url = Some(remote_url);
    }

    match cli.command {
        Commands::Export { output, quiet } => export::cmd_export(&config, output, quiet).await,
        Commands::Visible { html, url } => visible::cmd_visible(&config, html, url).await,
        Commands::ServeStdio => stdio::cmd_serve_stdio(&config).await,
    }
}
