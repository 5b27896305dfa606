//! `mangashelf covers` – download volume covers into per-series directories.

use anyhow::Result;
use mangashelf_core::catalog::MangaDexClient;
use mangashelf_core::config::ShelfConfig;
use mangashelf_core::covers::{run_covers, CoverOptions, CoverRequest};
use mangashelf_core::http::HttpClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::io;

/// Parsed `covers` flags.
#[derive(Debug)]
pub struct CoversArgs {
    pub file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub dir: PathBuf,
    pub ids: Vec<String>,
    pub jobs: Option<usize>,
    pub entry_jobs: Option<usize>,
    pub interval_ms: Option<u64>,
    pub inexact: bool,
}

impl CoversArgs {
    /// Config values with this run's overrides applied.
    pub fn options(&self, cfg: &ShelfConfig) -> CoverOptions {
        let mut opts = CoverOptions::from_config(&cfg.covers, self.dir.clone());
        if let Some(n) = self.jobs {
            opts.cover_concurrency = n;
        }
        if let Some(n) = self.entry_jobs {
            opts.entry_concurrency = n;
        }
        if let Some(ms) = self.interval_ms {
            opts.search_interval = Duration::from_millis(ms);
        }
        opts.download_inexact_matches |= self.inexact;
        opts
    }
}

pub async fn run_covers_command(
    cfg: &ShelfConfig,
    args: CoversArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let request = if args.ids.is_empty() {
        CoverRequest::Titles(io::read_records(args.file.as_deref())?)
    } else {
        if args.file.is_some() {
            tracing::warn!("--ids given, ignoring --file");
        }
        CoverRequest::Ids(args.ids.clone())
    };
    tracing::info!("downloading covers for {} record(s)", request.len());

    let opts = args.options(cfg);
    let client = Arc::new(MangaDexClient::new(HttpClient::new(&cfg.http), &cfg.endpoints)?);
    let report = io::open_report(args.output.as_deref())?;

    run_covers(client, request, report, &opts, cancel).await?;
    Ok(())
}
