//! Command-line interface for eventsonar.
//!
//! Each pipeline command prints its outcome as pretty JSON and exits with
//! status 1 when the outcome is an error.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::{self, paths};
use crate::core::Orchestrator;
use crate::domain::StageOutcome;

/// eventsonar - Event listing scraper and audio summary pipeline
#[derive(Parser, Debug)]
#[command(name = "eventsonar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List events (scrapes when the cached list is older than the TTL)
    Events {
        /// Scrape even if the cached list is fresh
        #[arg(short, long)]
        refresh: bool,
    },

    /// Search events by title, hosts or location
    Search {
        /// Search query
        query: String,

        /// Only print the first matching event's identifier
        #[arg(long)]
        first: bool,
    },

    /// Extract and store the detail text for an event page
    Detail {
        /// Event page URL
        event_url: String,

        /// Re-extract even if a stored detail exists
        #[arg(short, long)]
        force: bool,
    },

    /// Summarize an event's stored detail
    Summary {
        /// Event ID (last path segment of the event URL)
        event_id: String,
    },

    /// Synthesize speech for a summary and store the clip
    Voice {
        /// Event ID
        event_id: String,

        /// Summary text (reads from stdin if not provided)
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Run detail, summary and voice for one event
    Run {
        /// Event page URL
        event_url: String,

        /// Re-extract even if a stored detail exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show an event's pipeline progress
    Status {
        /// Event ID
        event_id: String,
    },

    /// Locate a stored clip, optionally copying it out
    Audio {
        /// Event ID
        event_id: String,

        /// Copy the clip to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Events { refresh } => {
                let orchestrator = pipeline().await?;
                let outcome = if refresh {
                    orchestrator.refresh_events().await
                } else {
                    orchestrator.list_events().await
                };
                report(&outcome)
            }
            Commands::Search { query, first } => {
                let orchestrator = pipeline().await?;
                if first {
                    report(&orchestrator.find_event(&query).await)
                } else {
                    report(&orchestrator.search_events(&query).await)
                }
            }
            Commands::Detail { event_url, force } => {
                report(&pipeline().await?.request_detail(&event_url, force).await)
            }
            Commands::Summary { event_id } => {
                report(&pipeline().await?.request_summary(&event_id).await)
            }
            Commands::Voice { event_id, text } => {
                let text = match text {
                    Some(text) => text,
                    None => read_stdin()?,
                };
                report(&pipeline().await?.request_voice(&event_id, &text).await)
            }
            Commands::Run { event_url, force } => {
                report(&pipeline().await?.run_all(&event_url, force).await)
            }
            Commands::Status { event_id } => {
                report(&pipeline().await?.status(&event_id).await)
            }
            Commands::Audio { event_id, output } => {
                let outcome = pipeline().await?.audio(&event_id).await;
                if let (StageOutcome::Success(clip), Some(output)) = (&outcome, output) {
                    copy_clip(&clip.audio_reference, &output).await?;
                    eprintln!("[Copied {} bytes to {}]", clip.size_bytes, output.display());
                }
                report(&outcome)
            }
            Commands::Config => show_config(),
        }
    }
}

/// Orchestrator wired from the resolved configuration
async fn pipeline() -> Result<Orchestrator> {
    Orchestrator::from_config(config::config()?).await
}

/// Print the outcome; an error outcome exits with status 1
fn report<T: Serialize>(outcome: &StageOutcome<T>) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome).context("Failed to serialize outcome")?;
    println!("{}", json);

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Read summary text from piped stdin
fn read_stdin() -> Result<String> {
    if io::stdin().is_terminal() {
        anyhow::bail!("No summary text provided. Use --text <summary> or pipe to stdin");
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer)
}

async fn copy_clip(reference: &str, output: &Path) -> Result<()> {
    tokio::fs::copy(reference, output)
        .await
        .with_context(|| format!("Failed to copy {} to {}", reference, output.display()))?;
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("eventsonar configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Snapshot: {}", paths::snapshot_file(&cfg.home).display());
    println!("  Details:  {}", paths::details_dir(&cfg.home).display());
    println!("  Voice:    {}", paths::voice_dir(&cfg.home).display());
    println!("  Journal:  {}", paths::journal_dir(&cfg.home).display());
    println!();
    println!("Settings:");
    println!(
        "{}",
        serde_json::to_string_pretty(cfg).context("Failed to serialize configuration")?
    );

    Ok(())
}
