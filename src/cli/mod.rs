//! CLI Module
//!
//! Command-line interface for setupflow using Clap v4. Lets operators
//! inspect page plans and the persisted onboarding state without a host UI.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::onboarding::ConnectionMode;

/// setupflow - Orchestration core for a guided first-run setup wizard
#[derive(Parser, Debug)]
#[command(name = "setupflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging for setupflow and its dependencies
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the pages a session would walk through
    Plan {
        /// Connection mode: remote, unconfigured (or none), local
        #[arg(short, long, default_value = "local")]
        mode: ConnectionMode,

        /// The assistant still needs its first-run bootstrap chat
        #[arg(short, long)]
        bootstrap: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show whether onboarding would be shown on next launch
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Forget that onboarding was completed
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Check whether text would be picked up as an authorization code
    Extract {
        /// Text as it would appear on the clipboard
        text: String,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Main CLI entry point
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;
    let _log_guard = crate::logging::init(&config.logging, cli.debug)?;
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }
    config.validate()?;

    match cli.command {
        Commands::Plan {
            mode,
            bootstrap,
            format,
        } => commands::cmd_plan(mode, bootstrap, format),
        Commands::Status { format } => commands::cmd_status(format),
        Commands::Reset { force } => commands::cmd_reset(force),
        Commands::Extract { text } => commands::cmd_extract(&config, &text),
        Commands::Config => commands::cmd_config(&config),
    }
}
