//! `mangashelf publishers` – English publishers per title.

use anyhow::Result;
use mangashelf_core::catalog::MangaUpdatesClient;
use mangashelf_core::config::ShelfConfig;
use mangashelf_core::http::HttpClient;
use mangashelf_core::publishers::run_publishers;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::io;

pub async fn run_publishers_command(
    cfg: &ShelfConfig,
    file: Option<&Path>,
    output: Option<&Path>,
    interval_ms: Option<u64>,
    cancel: &CancellationToken,
) -> Result<()> {
    let titles = io::read_records(file)?;
    tracing::info!("looking up publishers for {} title(s)", titles.len());

    let client = MangaUpdatesClient::new(HttpClient::new(&cfg.http), &cfg.endpoints)?;
    let interval = Duration::from_millis(interval_ms.unwrap_or(cfg.publishers.search_interval_ms));
    let report = io::open_report(output)?;

    run_publishers(&client, titles, report, interval, cancel).await?;
    Ok(())
}
