//! Catalog collaborators: title search, series lookup, cover listing, cover
//! fetch and publisher lookup.
//!
//! The pipelines only depend on these traits. [`MangaDexClient`] and
//! [`MangaUpdatesClient`] are the HTTP-backed implementations.

mod error;
mod mangadex;
mod mangaupdates;

#[cfg(test)]
pub(crate) mod fake;

pub use error::CatalogError;
pub use mangadex::MangaDexClient;
pub use mangaupdates::MangaUpdatesClient;

use async_trait::async_trait;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Opaque catalog identifier (a UUID on MangaDex, a numeric id on MangaUpdates).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesId(pub String);

impl SeriesId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesId {
    fn from(s: &str) -> Self {
        SeriesId(s.to_string())
    }
}

/// Best match for a query: the catalog's canonical title and its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub title: String,
    pub id: SeriesId,
}

/// One cover image listed for a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    /// Content key used to fetch the image (the upload's file name).
    pub file_name: String,
    /// Volume the cover belongs to; `None` when the catalog has no volume.
    pub volume: Option<String>,
}

/// Free-text title search returning the top hit.
#[async_trait]
pub trait TitleSearch: Send + Sync {
    /// Returns [`CatalogError::NotEnoughResults`] when the search has no hits.
    async fn search(
        &self,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, CatalogError>;
}

/// Direct lookup of a series by identifier.
#[async_trait]
pub trait SeriesLookup: Send + Sync {
    /// Returns [`CatalogError::NotEnoughResults`] when the id is unknown.
    async fn lookup(
        &self,
        id: &SeriesId,
        cancel: &CancellationToken,
    ) -> Result<Resolution, CatalogError>;
}

/// Lists the covers of a series, in catalog order.
#[async_trait]
pub trait CoverCatalog: Send + Sync {
    async fn covers(
        &self,
        id: &SeriesId,
        cancel: &CancellationToken,
    ) -> Result<Vec<CoverArt>, CatalogError>;
}

/// Downloads one cover image.
#[async_trait]
pub trait CoverFetch: Send + Sync {
    async fn fetch_cover(
        &self,
        id: &SeriesId,
        cover: &CoverArt,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CatalogError>;
}

/// English-language publishers of a series.
#[async_trait]
pub trait PublisherCatalog: Send + Sync {
    async fn english_publishers(
        &self,
        id: &SeriesId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError>;
}

/// Everything the cover pipeline needs from a catalog.
pub trait CoverSource: TitleSearch + SeriesLookup + CoverCatalog + CoverFetch {}

impl<T> CoverSource for T where T: TitleSearch + SeriesLookup + CoverCatalog + CoverFetch {}

/// Everything the publisher pipeline needs from a catalog.
pub trait PublisherSource: TitleSearch + PublisherCatalog {}

impl<T> PublisherSource for T where T: TitleSearch + PublisherCatalog {}
