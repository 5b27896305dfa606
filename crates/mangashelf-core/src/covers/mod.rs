//! Cover download pipeline.
//!
//! Records are resolved one at a time (optionally throttled). Each exact match
//! becomes one job in the outer [`JobGroup`]; that job lists the series'
//! covers and downloads the missing ones through its own inner group. Covers
//! whose archive already exists are never submitted, so re-running over a
//! partially finished directory only fetches what is missing.
//!
//! Soft failures (no hit, inexact hit) are written to the report during the
//! sequential pass, so report rows follow input order. The report has no
//! header; each row is the input record and an empty status.
//!
//! Destinations are claimed run-wide before a download is submitted. A series
//! that resolves twice is processed once, and two series whose sanitized
//! titles collide never write the same archive.


use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogError, CoverArt, CoverSource, Resolution, SeriesId};
use crate::config::CoversConfig;
use crate::group::{JobGroup, Throttle};
use crate::naming;
use crate::report::ReportWriter;
use crate::storage;

/// Status column for records that did not resolve to an exact match.
pub const NOT_FOUND_STATUS: &str = "";

/// Archive paths planned so far in this run, shared by every outer job.
type Claims = Arc<Mutex<HashSet<PathBuf>>>;

/// What the input records are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverRequest {
    /// Free-text titles, resolved through catalog search (exact match only
    /// unless inexact matches are enabled).
    Titles(Vec<String>),
    /// Catalog identifiers, resolved by direct lookup.
    Ids(Vec<String>),
}

impl CoverRequest {
    pub fn len(&self) -> usize {
        match self {
            CoverRequest::Titles(v) | CoverRequest::Ids(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Knobs for one cover run.
#[derive(Debug, Clone)]
pub struct CoverOptions {
    /// Root directory; each series gets a sub-directory named after its title.
    pub out_dir: PathBuf,
    /// Inner group ceiling: concurrent cover downloads per series (0 = unbounded).
    pub cover_concurrency: usize,
    /// Outer group ceiling: concurrent series (0 = unbounded).
    pub entry_concurrency: usize,
    /// Minimum spacing between record resolutions (zero disables the throttle).
    pub search_interval: Duration,
    /// Download covers for inexact top hits instead of reporting them.
    pub download_inexact_matches: bool,
}

impl CoverOptions {
    pub fn from_config(cfg: &CoversConfig, out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            cover_concurrency: cfg.cover_concurrency,
            entry_concurrency: cfg.entry_concurrency,
            search_interval: Duration::from_millis(cfg.search_interval_ms),
            download_inexact_matches: cfg.download_inexact_matches,
        }
    }
}

/// Counts for one finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverSummary {
    /// Records that resolved and had their covers processed.
    pub resolved: usize,
    /// Records reported as not found.
    pub not_found: usize,
    /// Covers downloaded and written.
    pub fetched: usize,
    /// Covers skipped because their archive already existed.
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct Counters {
    fetched: AtomicUsize,
    skipped: AtomicUsize,
}

/// One resolved series and where its covers go.
#[derive(Debug, Clone)]
struct Entry {
    id: SeriesId,
    title: String,
    dir: PathBuf,
}

/// Run the cover pipeline over `request`, writing soft failures to `output`.
///
/// Returns the first hard error: a catalog failure during resolution, a
/// filesystem error, or the first failed cover job. Cancelling `cancel`
/// stops admission and returns the cancellation once the outer group sees it.
pub async fn run_covers<S, W>(
    source: Arc<S>,
    request: CoverRequest,
    output: W,
    opts: &CoverOptions,
    cancel: &CancellationToken,
) -> Result<CoverSummary>
where
    S: CoverSource + 'static,
    W: Write,
{
    let mut report = ReportWriter::new(output, None)?;

    storage::ensure_dir(&opts.out_dir)?;
    tracing::info!("created output directory {}", opts.out_dir.display());

    let (mut entries, entries_token) = JobGroup::new(cancel);
    entries.set_limit(opts.entry_concurrency);
    let mut throttle = Throttle::new(opts.search_interval);
    let counters = Arc::new(Counters::default());
    let claims: Claims = Arc::default();
    let mut queued: HashSet<SeriesId> = HashSet::new();
    let mut summary = CoverSummary::default();

    let (records, by_id) = match request {
        CoverRequest::Titles(titles) => (titles, false),
        CoverRequest::Ids(ids) => (ids, true),
    };

    for record in records {
        if throttle.admit(&entries_token).await.is_err() {
            tracing::debug!("admission stopped, not resolving {:?}", record);
            break;
        }

        let resolved = if by_id {
            source.lookup(&SeriesId(record.clone()), &entries_token).await
        } else {
            source.search(&record, &entries_token).await
        };
        let resolution = match resolved {
            Ok(r) => r,
            Err(e) if e.is_soft() => {
                tracing::info!("no results for {:?}", record);
                report.write_row(&record, NOT_FOUND_STATUS)?;
                summary.not_found += 1;
                continue;
            }
            Err(CatalogError::Cancelled(_)) => break,
            Err(e) => {
                return Err(e).with_context(|| format!("error searching for {:?}", record));
            }
        };

        if !by_id && resolution.title != record {
            if !opts.download_inexact_matches {
                tracing::info!("{:?} != {:?}, continuing", resolution.title, record);
                report.write_row(&record, NOT_FOUND_STATUS)?;
                summary.not_found += 1;
                continue;
            }
            tracing::warn!(
                "{:?} != {:?}, downloading top hit anyway",
                resolution.title,
                record
            );
        }

        if !queued.insert(resolution.id.clone()) {
            tracing::info!("{:?} already queued as {}, skipping", record, resolution.id);
            continue;
        }

        let entry = prepare_entry(&opts.out_dir, resolution)?;
        summary.resolved += 1;

        let source = Arc::clone(&source);
        let counters = Arc::clone(&counters);
        let claims = Arc::clone(&claims);
        let token = entries_token.clone();
        let limit = opts.cover_concurrency;
        entries
            .submit(move || fetch_entry_covers(source, entry, limit, token, counters, claims))
            .await;
    }

    entries.wait().await?;
    report.finish()?;

    summary.fetched = counters.fetched.load(Ordering::Acquire);
    summary.skipped = counters.skipped.load(Ordering::Acquire);
    tracing::info!(
        resolved = summary.resolved,
        not_found = summary.not_found,
        fetched = summary.fetched,
        skipped = summary.skipped,
        "cover run finished"
    );
    Ok(summary)
}

/// Create the series directory (an existing one is fine).
fn prepare_entry(out_dir: &std::path::Path, resolution: Resolution) -> Result<Entry> {
    let title = naming::sanitize_component(&resolution.title);
    let dir = out_dir.join(&title);
    storage::ensure_dir(&dir)?;
    Ok(Entry {
        id: resolution.id,
        title,
        dir,
    })
}

/// Outer job: list the series' covers and download the missing ones.
async fn fetch_entry_covers<S>(
    source: Arc<S>,
    entry: Entry,
    limit: usize,
    cancel: CancellationToken,
    counters: Arc<Counters>,
    claims: Claims,
) -> Result<()>
where
    S: CoverSource + 'static,
{
    tracing::info!("getting covers for: {:?}", entry.title);
    let covers = source
        .covers(&entry.id, &cancel)
        .await
        .with_context(|| format!("error getting covers for {:?}", entry.title))?;

    let (mut group, token) = JobGroup::new(&cancel);
    group.set_limit(limit);

    for (dest, cover) in latest_per_destination(&entry, covers) {
        if token.is_cancelled() {
            break;
        }

        if !claim(&claims, &dest) {
            tracing::debug!("{} already planned in this run", dest.display());
            continue;
        }
        if storage::cover_exists(&dest) {
            tracing::debug!("already have {}", dest.display());
            counters.skipped.fetch_add(1, Ordering::AcqRel);
            continue;
        }

        let source = Arc::clone(&source);
        let id = entry.id.clone();
        let job_token = token.clone();
        let counters = Arc::clone(&counters);
        group
            .submit(move || download_cover(source, id, cover, dest, job_token, counters))
            .await;
    }

    group.wait().await?;
    Ok(())
}

/// Pair each cover with its archive path. When several covers map to the same
/// path the last one listed wins, keeping the position of the first.
fn latest_per_destination(entry: &Entry, covers: Vec<CoverArt>) -> Vec<(PathBuf, CoverArt)> {
    let mut planned: Vec<(PathBuf, CoverArt)> = Vec::with_capacity(covers.len());
    let mut index: HashMap<PathBuf, usize> = HashMap::new();
    for cover in covers {
        let dest = entry
            .dir
            .join(naming::cover_file_name(&entry.title, cover.volume.as_deref()));
        match index.get(&dest) {
            Some(&i) => {
                tracing::debug!("duplicate cover for {}, keeping {}", dest.display(), cover.file_name);
                planned[i].1 = cover;
            }
            None => {
                index.insert(dest.clone(), planned.len());
                planned.push((dest, cover));
            }
        }
    }
    planned
}

/// Reserve `dest` for this run. False if another job already holds it.
fn claim(claims: &Mutex<HashSet<PathBuf>>, dest: &std::path::Path) -> bool {
    claims
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(dest.to_path_buf())
}

/// Inner job: fetch one cover and package it at `dest`.
async fn download_cover<S>(
    source: Arc<S>,
    id: SeriesId,
    cover: CoverArt,
    dest: PathBuf,
    cancel: CancellationToken,
    counters: Arc<Counters>,
) -> Result<()>
where
    S: CoverSource + 'static,
{
    let entry_name = naming::cover_entry_name(&cover.file_name)
        .ok_or_else(|| anyhow::anyhow!("malformed cover file name: {:?}", cover.file_name))?;

    let bytes = source
        .fetch_cover(&id, &cover, &cancel)
        .await
        .with_context(|| format!("error downloading cover {}", cover.file_name))?;

    let path = dest.clone();
    let size =
        tokio::task::spawn_blocking(move || storage::write_single_entry_zip(&path, &entry_name, &bytes))
            .await
            .context("archive task join")??;

    counters.fetched.fetch_add(1, Ordering::AcqRel);
    tracing::info!("created {} ({} bytes)", dest.display(), size);
    Ok(())
}
