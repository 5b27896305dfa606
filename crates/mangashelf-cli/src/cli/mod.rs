//! CLI for mangashelf: batch publisher lookups and cover downloads.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mangashelf_core::config;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use commands::{run_covers_command, run_publishers_command, CoversArgs};

/// Top-level CLI for mangashelf.
#[derive(Debug, Parser)]
#[command(name = "mangashelf")]
#[command(about = "Look up manga publishers and download volume covers in bulk", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Write the English publishers of each title as CSV.
    Publishers {
        /// CSV input with one title per line (default: stdin).
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// CSV report destination (default: stdout).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Milliseconds between catalog searches (overrides config; 0 disables).
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },

    /// Download every volume cover of each title into zip archives.
    Covers {
        /// CSV input with one title per line (default: stdin).
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,
        /// CSV report of titles without an exact match, one `title,` row each (default: stdout).
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Directory that receives one sub-directory per series.
        #[arg(short, long, value_name = "DIR", default_value = "covers")]
        dir: PathBuf,
        /// Comma-separated catalog ids; skips title search and ignores --file.
        #[arg(long, value_name = "ID,...", value_delimiter = ',', num_args = 1..)]
        ids: Vec<String>,
        /// Concurrent cover downloads per series (overrides config; 0 = unbounded).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
        /// Concurrent series (overrides config; 0 = unbounded).
        #[arg(long, value_name = "N")]
        entry_jobs: Option<usize>,
        /// Milliseconds between catalog searches (overrides config; 0 disables).
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
        /// Also download covers when the top hit is not an exact title match.
        #[arg(long)]
        inexact: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        let cancel = CancellationToken::new();
        spawn_ctrl_c(cancel.clone());

        match cli.command {
            CliCommand::Publishers {
                file,
                output,
                interval_ms,
            } => {
                run_publishers_command(&cfg, file.as_deref(), output.as_deref(), interval_ms, &cancel)
                    .await?
            }
            CliCommand::Covers {
                file,
                output,
                dir,
                ids,
                jobs,
                entry_jobs,
                interval_ms,
                inexact,
            } => {
                let args = CoversArgs {
                    file,
                    output,
                    dir,
                    ids,
                    jobs,
                    entry_jobs,
                    interval_ms,
                    inexact,
                };
                run_covers_command(&cfg, args, &cancel).await?
            }
        }

        Ok(())
    }
}

/// Cancel `token` on the first Ctrl-C; running requests stop at their next check.
fn spawn_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            token.cancel();
        }
    });
}

#[cfg(test)]
mod tests;
