//! # Hook-Ledger CLI
//!
//! Command-line consumer for the hook-ledger service.
//!
//! This crate provides commands for:
//! - Polling new events with a persisted cursor
//! - Watching for events continuously
//! - Listing events in the legacy timestamp mode
//! - Clearing the event store
//! - Probing service health

pub mod client;
pub mod cursor;
pub mod output;
pub mod poller;

use clap::{CommandFactory, Parser, Subcommand};
use client::EventsClient;
use cursor::CursorFile;
use output::{render_batch, render_health, OutputFormat};
use poller::Poller;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

/// Hook-Ledger CLI - Poll normalized GitHub webhook events
#[derive(Parser)]
#[command(name = "hook-ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Poll normalized GitHub webhook events from a hook-ledger service")]
pub struct Cli {
    /// Base URL of the hook-ledger service
    #[arg(long, env = "HOOK_LEDGER_URL", default_value = "http://localhost:8080")]
    pub url: String,

    /// Cursor state file
    #[arg(long, env = "HOOK_LEDGER_STATE")]
    pub state_file: Option<PathBuf>,

    /// Logging level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Event retrieval and management commands
    Events {
        #[command(subcommand)]
        action: EventCommands,
    },

    /// Check service health
    Health {
        /// Include event store connectivity
        #[arg(long)]
        deep: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Event subcommands
#[derive(Subcommand)]
pub enum EventCommands {
    /// Fetch events after the saved cursor and advance it
    Poll {
        /// Maximum events per request
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Poll repeatedly until interrupted
    Watch {
        /// Seconds between polls
        #[arg(short, long, default_value = "15")]
        interval: u64,

        /// Maximum events per request
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List events newer than a timestamp without touching the cursor
    List {
        /// Canonical timestamp, e.g. "2021-02-22 09:00:00 UTC"
        #[arg(short, long)]
        since: Option<String>,

        /// Maximum events to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Delete every stored event
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Forget the saved cursor
    ResetCursor,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Request failed: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Service is unhealthy (HTTP {status})")]
    Unhealthy { status: u16 },

    #[error("Cursor state error at {}: {message}", path.display())]
    CursorState { path: PathBuf, message: String },

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::Connection(_) => 3,
            Self::Service { .. } => 4,
            Self::Unhealthy { .. } => 5,
            Self::CursorState { .. } => 6,
            Self::Output(_) | Self::Io(_) => 7,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    initialize_logging(&cli);
    run(cli).await
}

/// Execute a parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let format = cli.format;
    let cursor_file = CursorFile::new(cli.state_file.clone().unwrap_or_else(CursorFile::default_path));

    match cli.command {
        Commands::Events { action } => {
            execute_events_command(action, &cli.url, cursor_file, format).await
        }
        Commands::Health { deep } => execute_health_command(&cli.url, deep, format).await,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let mut stdout = std::io::stdout().lock();
            clap_complete::generate(shell, &mut command, "hook-ledger", &mut stdout);
            stdout.flush()?;
            Ok(())
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Install a stderr subscriber so stdout carries only command output
fn initialize_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hook_ledger_cli={}", cli.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn execute_events_command(
    action: EventCommands,
    url: &str,
    cursor_file: CursorFile,
    format: OutputFormat,
) -> Result<(), CliError> {
    match action {
        EventCommands::Poll { limit } => {
            let poller = Poller::new(EventsClient::new(url)?, cursor_file, limit);
            let outcome = poller.poll_once(|batch| print_batch(batch, format)).await?;
            info!(count = outcome.batch.count, cursor = ?outcome.cursor, "Poll complete");
            Ok(())
        }
        EventCommands::Watch { interval, limit } => {
            if interval == 0 {
                return Err(CliError::InvalidArgument {
                    arg: "--interval".to_string(),
                    message: "must be at least one second".to_string(),
                });
            }

            let poller = Poller::new(EventsClient::new(url)?, cursor_file, limit);
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                    std::future::pending::<()>().await;
                }
            };
            poller
                .watch(
                    Duration::from_secs(interval),
                    |batch| {
                        if batch.events.is_empty() {
                            Ok(())
                        } else {
                            print_batch(batch, format)
                        }
                    },
                    shutdown,
                )
                .await;
            Ok(())
        }
        EventCommands::List { since, limit } => {
            let client = EventsClient::new(url)?;
            let batch = client.list_since(since.as_deref(), limit).await?;
            print_batch(&batch, format)
        }
        EventCommands::Clear { yes } => {
            if !yes {
                return Err(CliError::InvalidArgument {
                    arg: "--yes".to_string(),
                    message: "clearing deletes every stored event; pass --yes to confirm"
                        .to_string(),
                });
            }

            let deleted = EventsClient::new(url)?.clear().await?;
            warn!(deleted, "Cleared event store");
            match format {
                OutputFormat::Json => {
                    write_stdout(&serde_json::json!({ "deleted": deleted }).to_string())
                }
                OutputFormat::Text => write_stdout(&format!("Deleted {} events", deleted)),
            }
        }
        EventCommands::ResetCursor => {
            let removed = cursor_file.reset().await?;
            if removed {
                write_stdout(&format!("Cursor reset ({})", cursor_file.path().display()))
            } else {
                write_stdout(&format!("No saved cursor at {}", cursor_file.path().display()))
            }
        }
    }
}

async fn execute_health_command(url: &str, deep: bool, format: OutputFormat) -> Result<(), CliError> {
    let report = EventsClient::new(url)?.health(deep).await?;
    write_stdout(&render_health(&report, format)?)?;

    if report.healthy {
        Ok(())
    } else {
        Err(CliError::Unhealthy {
            status: report.status_code,
        })
    }
}

fn print_batch(batch: &hook_ledger_core::RetrievalResponse, format: OutputFormat) -> Result<(), CliError> {
    write_stdout(&render_batch(batch, format)?)
}

/// Write one block of command output; a closed stdout is an error, not a panic
fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
