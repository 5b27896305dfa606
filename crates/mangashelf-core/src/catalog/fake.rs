//! In-memory catalog for pipeline tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{
    CatalogError, CoverArt, CoverCatalog, CoverFetch, PublisherCatalog, Resolution, SeriesId,
    SeriesLookup, TitleSearch,
};
use crate::group::Cancelled;

pub(crate) fn cover(file_name: &str, volume: Option<&str>) -> CoverArt {
    CoverArt {
        file_name: file_name.to_string(),
        volume: volume.map(str::to_string),
    }
}

fn server_error(what: &str) -> CatalogError {
    CatalogError::Status {
        url: format!("fake://{}", what),
        status: 500,
        body: "internal error".to_string(),
    }
}

/// Canned catalog. Series are keyed by search query and by id.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    hits: HashMap<String, Resolution>,
    by_id: HashMap<String, Resolution>,
    covers: HashMap<String, Vec<CoverArt>>,
    publishers: HashMap<String, Vec<String>>,
    broken_queries: HashSet<String>,
    broken_covers: HashSet<String>,
    fetch_delay: Duration,
    searches: Mutex<Vec<String>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a series whose search for `query` returns `title`/`id`.
    pub(crate) fn with_series(mut self, query: &str, title: &str, id: &str, covers: Vec<CoverArt>) -> Self {
        let resolution = Resolution {
            title: title.to_string(),
            id: SeriesId::from(id),
        };
        self.hits.insert(query.to_string(), resolution.clone());
        self.by_id.insert(id.to_string(), resolution);
        self.covers.insert(id.to_string(), covers);
        self
    }

    pub(crate) fn with_publishers(mut self, id: &str, names: &[&str]) -> Self {
        self.publishers
            .insert(id.to_string(), names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Searching for `query` fails with a server error.
    pub(crate) fn with_broken_query(mut self, query: &str) -> Self {
        self.broken_queries.insert(query.to_string());
        self
    }

    /// Fetching the cover with `file_name` fails with a transport error.
    pub(crate) fn with_broken_cover(mut self, file_name: &str) -> Self {
        self.broken_covers.insert(file_name.to_string());
        self
    }

    pub(crate) fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// File names of every cover fetch that started, in start order.
    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub(crate) fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl TitleSearch for FakeCatalog {
    async fn search(
        &self,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, CatalogError> {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }
        self.searches.lock().unwrap().push(title.to_string());
        if self.broken_queries.contains(title) {
            return Err(server_error("search"));
        }
        self.hits
            .get(title)
            .cloned()
            .ok_or(CatalogError::NotEnoughResults)
    }
}

#[async_trait]
impl SeriesLookup for FakeCatalog {
    async fn lookup(
        &self,
        id: &SeriesId,
        _cancel: &CancellationToken,
    ) -> Result<Resolution, CatalogError> {
        self.by_id
            .get(id.as_str())
            .cloned()
            .ok_or(CatalogError::NotEnoughResults)
    }
}

#[async_trait]
impl CoverCatalog for FakeCatalog {
    async fn covers(
        &self,
        id: &SeriesId,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CoverArt>, CatalogError> {
        self.covers
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| server_error("covers"))
    }
}

#[async_trait]
impl CoverFetch for FakeCatalog {
    async fn fetch_cover(
        &self,
        _id: &SeriesId,
        cover: &CoverArt,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CatalogError> {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }
        self.fetched.lock().unwrap().push(cover.file_name.clone());
        if self.broken_covers.contains(&cover.file_name) {
            return Err(CatalogError::Transport {
                url: format!("fake://covers/{}", cover.file_name),
                source: curl::Error::new(7),
            });
        }
        if !self.fetch_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Cancelled.into()),
                _ = tokio::time::sleep(self.fetch_delay) => {}
            }
        }
        Ok(format!("image bytes of {}", cover.file_name).into_bytes())
    }
}

#[async_trait]
impl PublisherCatalog for FakeCatalog {
    async fn english_publishers(
        &self,
        id: &SeriesId,
        _cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError> {
        self.publishers
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| server_error("series"))
    }
}
