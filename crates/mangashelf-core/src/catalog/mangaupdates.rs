//! MangaUpdates client: series search and publisher lookup.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{CatalogError, PublisherCatalog, Resolution, SeriesId, TitleSearch};
use crate::config::EndpointsConfig;
use crate::http::{self, HttpClient};

/// Publisher type kept by [`PublisherCatalog::english_publishers`].
const ENGLISH: &str = "English";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    record: SeriesRecord,
}

#[derive(Debug, Deserialize)]
struct SeriesRecord {
    series_id: i64,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SeriesDetail {
    #[serde(default)]
    publishers: Vec<Publisher>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    publisher_name: String,
    #[serde(rename = "type", default)]
    kind: String,
}

fn english_names(detail: SeriesDetail) -> Vec<String> {
    detail
        .publishers
        .into_iter()
        .filter(|p| p.kind == ENGLISH)
        .map(|p| p.publisher_name)
        .collect()
}

/// HTTP-backed MangaUpdates catalog.
#[derive(Debug, Clone)]
pub struct MangaUpdatesClient {
    http: HttpClient,
    api: Url,
}

impl MangaUpdatesClient {
    pub fn new(http: HttpClient, endpoints: &EndpointsConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            http,
            api: http::parse_base(&endpoints.mangaupdates_api)?,
        })
    }
}

#[async_trait]
impl TitleSearch for MangaUpdatesClient {
    async fn search(
        &self,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, CatalogError> {
        let url = http::endpoint(&self.api, &["series", "search"])?;
        let resp: SearchResponse = self
            .http
            .post_form_json(url, &[("search", title)], cancel)
            .await?;
        let top = resp
            .results
            .into_iter()
            .next()
            .ok_or(CatalogError::NotEnoughResults)?;
        Ok(Resolution {
            title: top.record.title,
            id: SeriesId(top.record.series_id.to_string()),
        })
    }
}

#[async_trait]
impl PublisherCatalog for MangaUpdatesClient {
    async fn english_publishers(
        &self,
        id: &SeriesId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError> {
        let url = http::endpoint(&self.api, &["series", id.as_str()])?;
        let detail: SeriesDetail = self.http.get_json(url, cancel).await?;
        Ok(english_names(detail))
    }
}
