//! Publisher lookup pipeline.
//!
//! Strictly sequential: every title costs two catalog requests, so the
//! throttle (not a job group) is what keeps the request rate polite. Each
//! title yields exactly one report row, in input order.

use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogError, PublisherSource};
use crate::group::Throttle;
use crate::report::ReportWriter;

/// Header row of the publisher report.
pub const REPORT_HEADER: [&str; 2] = ["title", "publishers"];

/// Second column for titles whose search had no exact match.
pub const NOT_FOUND: &str = "exact match not found";

/// Counts for one finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherSummary {
    /// Titles looked up.
    pub searched: usize,
    /// Titles without an exact match.
    pub not_found: usize,
    /// Exact matches with at least one English publisher.
    pub with_publishers: usize,
}

/// Format a publisher list for the report: `[A B]`.
pub fn format_publishers(names: &[String]) -> String {
    format!("[{}]", names.join(" "))
}

/// Look up the English publishers of every title and write one row per title.
///
/// Exact title matches get their publisher list (an empty cell when the
/// series has none); everything else gets [`NOT_FOUND`]. Hard catalog
/// errors and cancellation abort the run, keeping rows already written.
pub async fn run_publishers<S, W>(
    source: &S,
    titles: Vec<String>,
    output: W,
    search_interval: Duration,
    cancel: &CancellationToken,
) -> Result<PublisherSummary>
where
    S: PublisherSource + ?Sized,
    W: Write,
{
    let mut report = ReportWriter::new(output, Some(REPORT_HEADER))?;
    let mut throttle = Throttle::new(search_interval);
    let mut summary = PublisherSummary::default();

    for title in titles {
        throttle.admit(cancel).await?;
        summary.searched += 1;

        let resolution = match source.search(&title, cancel).await {
            Ok(r) if r.title == title => r,
            Ok(r) => {
                tracing::info!("{:?} != {:?}, continuing", r.title, title);
                report.write_row(&title, NOT_FOUND)?;
                summary.not_found += 1;
                continue;
            }
            Err(CatalogError::NotEnoughResults) => {
                tracing::info!("no results for {:?}", title);
                report.write_row(&title, NOT_FOUND)?;
                summary.not_found += 1;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("error searching manga {:?}", title));
            }
        };

        let publishers = source
            .english_publishers(&resolution.id, cancel)
            .await
            .with_context(|| format!("error getting publishers for {:?}", title))?;

        let cell = if publishers.is_empty() {
            String::new()
        } else {
            summary.with_publishers += 1;
            format_publishers(&publishers)
        };
        tracing::debug!("{:?}: {:?}", title, cell);
        report.write_row(&title, &cell)?;
    }

    report.finish()?;
    tracing::info!(
        searched = summary.searched,
        not_found = summary.not_found,
        with_publishers = summary.with_publishers,
        "publisher run finished"
    );
    Ok(summary)
}
