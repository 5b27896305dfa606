//! MangaDex client: title search, series lookup, cover listing and cover download.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{
    CatalogError, CoverArt, CoverCatalog, CoverFetch, Resolution, SeriesId, SeriesLookup,
    TitleSearch,
};
use crate::config::EndpointsConfig;
use crate::http::{self, HttpClient};

/// Page size for cover listing (the API maximum).
const COVER_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct Single<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Entity<A> {
    id: String,
    attributes: A,
}

#[derive(Debug, Deserialize)]
struct MangaAttributes {
    #[serde(default)]
    title: BTreeMap<String, String>,
}

impl MangaAttributes {
    /// English title, or the first localized title when there is none.
    fn display_title(&self) -> String {
        self.title
            .get("en")
            .or_else(|| self.title.values().next())
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct CoverAttributes {
    #[serde(default)]
    volume: Option<String>,
    #[serde(rename = "fileName")]
    file_name: String,
}

impl From<Entity<CoverAttributes>> for CoverArt {
    fn from(e: Entity<CoverAttributes>) -> Self {
        let volume = e.attributes.volume.filter(|v| !v.trim().is_empty());
        CoverArt {
            file_name: e.attributes.file_name,
            volume,
        }
    }
}

/// HTTP-backed MangaDex catalog.
#[derive(Debug, Clone)]
pub struct MangaDexClient {
    http: HttpClient,
    api: Url,
    uploads: Url,
}

impl MangaDexClient {
    pub fn new(http: HttpClient, endpoints: &EndpointsConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            http,
            api: http::parse_base(&endpoints.mangadex_api)?,
            uploads: http::parse_base(&endpoints.mangadex_uploads)?,
        })
    }

    fn cover_page_url(&self, id: &SeriesId, offset: usize) -> Result<Url, CatalogError> {
        let mut url = http::endpoint(&self.api, &["cover"])?;
        url.query_pairs_mut()
            .append_pair("limit", &COVER_PAGE_SIZE.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("order[volume]", "asc")
            .append_pair("manga[]", id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl TitleSearch for MangaDexClient {
    async fn search(
        &self,
        title: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, CatalogError> {
        let mut url = http::endpoint(&self.api, &["manga"])?;
        url.query_pairs_mut().append_pair("title", title);
        let resp: Collection<Entity<MangaAttributes>> = self.http.get_json(url, cancel).await?;
        let top = resp
            .data
            .into_iter()
            .next()
            .ok_or(CatalogError::NotEnoughResults)?;
        Ok(Resolution {
            title: top.attributes.display_title(),
            id: SeriesId(top.id),
        })
    }
}

#[async_trait]
impl SeriesLookup for MangaDexClient {
    async fn lookup(
        &self,
        id: &SeriesId,
        cancel: &CancellationToken,
    ) -> Result<Resolution, CatalogError> {
        let url = http::endpoint(&self.api, &["manga", id.as_str()])?;
        let resp: Single<Entity<MangaAttributes>> = match self.http.get_json(url, cancel).await {
            Ok(resp) => resp,
            Err(e) if e.status() == Some(404) => return Err(CatalogError::NotEnoughResults),
            Err(e) => return Err(e),
        };
        Ok(Resolution {
            title: resp.data.attributes.display_title(),
            id: SeriesId(resp.data.id),
        })
    }
}

#[async_trait]
impl CoverCatalog for MangaDexClient {
    async fn covers(
        &self,
        id: &SeriesId,
        cancel: &CancellationToken,
    ) -> Result<Vec<CoverArt>, CatalogError> {
        let mut covers = Vec::new();
        loop {
            let url = self.cover_page_url(id, covers.len())?;
            let page: Collection<Entity<CoverAttributes>> = self.http.get_json(url, cancel).await?;
            let fetched = page.data.len();
            covers.extend(page.data.into_iter().map(CoverArt::from));
            if fetched == 0 || covers.len() >= page.total {
                break;
            }
        }
        tracing::debug!(series = %id, count = covers.len(), "listed covers");
        Ok(covers)
    }
}

#[async_trait]
impl CoverFetch for MangaDexClient {
    async fn fetch_cover(
        &self,
        id: &SeriesId,
        cover: &CoverArt,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CatalogError> {
        let url = http::endpoint(&self.uploads, &["covers", id.as_str(), &cover.file_name])?;
        self.http.get_bytes(url, cancel).await
    }
}
