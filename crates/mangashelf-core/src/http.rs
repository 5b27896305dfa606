//! HTTP transport for the catalog clients.
//!
//! Uses the curl crate (libcurl). Each request runs on the blocking pool and
//! is aborted from the transfer progress callback once the caller's
//! cancellation token fires, so in-flight downloads stop at their own I/O
//! boundary instead of being killed.

use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::catalog::CatalogError;
use crate::config::HttpConfig;
use crate::group::Cancelled;

/// Maximum number of body bytes quoted in a status error.
const ERROR_BODY_LIMIT: usize = 256;

/// Request method and payload.
#[derive(Debug, Clone)]
pub enum Method {
    Get,
    /// POST with an `application/x-www-form-urlencoded` body.
    PostForm(String),
}

/// Raw response: status code and body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Reusable HTTP client. Cheap to clone; holds only settings, every request
/// gets its own curl handle.
#[derive(Debug, Clone)]
pub struct HttpClient {
    connect_timeout: Duration,
    timeout: Duration,
    user_agent: String,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            user_agent: cfg.user_agent.clone(),
        }
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        cancel: &CancellationToken,
    ) -> Result<T, CatalogError> {
        let label = url.to_string();
        let body = self.send(url, Method::Get, cancel).await?;
        decode_json(&label, &body)
    }

    /// POST `form` as a urlencoded body to `url` and decode the JSON response.
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T, CatalogError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter())
            .finish();
        let label = url.to_string();
        let body = self.send(url, Method::PostForm(body), cancel).await?;
        decode_json(&label, &body)
    }

    /// GET `url` and return the raw body.
    pub async fn get_bytes(
        &self,
        url: Url,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CatalogError> {
        self.send(url, Method::Get, cancel).await
    }

    /// Runs the request on the blocking pool; non-2xx statuses become
    /// [`CatalogError::Status`].
    async fn send(
        &self,
        url: Url,
        method: Method,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CatalogError> {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }
        let client = self.clone();
        let token = cancel.clone();
        let label = url.to_string();
        let response = tokio::task::spawn_blocking(move || client.perform(&url, &method, &token))
            .await
            .map_err(|e| CatalogError::Worker(e.to_string()))??;

        tracing::trace!(url = %label, status = response.status, bytes = response.body.len(), "HTTP response");
        if !response.is_success() {
            return Err(CatalogError::Status {
                url: label,
                status: response.status,
                body: quote_body(&response.body),
            });
        }
        Ok(response.body)
    }

    /// Performs one request in the current thread. Call from `spawn_blocking`
    /// if used from async code.
    pub fn perform(
        &self,
        url: &Url,
        method: &Method,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, CatalogError> {
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.progress(true)?;
        if let Method::PostForm(form) = method {
            easy.post(true)?;
            easy.post_fields_copy(form.as_bytes())?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            // Returning false aborts the transfer.
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            if let Err(err) = transfer.perform() {
                if err.is_aborted_by_callback() && cancel.is_cancelled() {
                    return Err(Cancelled.into());
                }
                return Err(CatalogError::Transport {
                    url: url.to_string(),
                    source: err,
                });
            }
        }

        let status = easy.response_code()?;
        Ok(HttpResponse { status, body })
    }
}

fn decode_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, CatalogError> {
    serde_json::from_slice(body).map_err(|source| CatalogError::Decode {
        url: url.to_string(),
        source,
    })
}

fn quote_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.len() <= ERROR_BODY_LIMIT {
        return text.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Append path segments to a base URL, e.g. `https://api.mangadex.org` +
/// `["manga", id]`.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, CatalogError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CatalogError::InvalidEndpoint(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Parse a configured base URL.
pub fn parse_base(raw: &str) -> Result<Url, CatalogError> {
    Url::parse(raw).map_err(|e| CatalogError::InvalidEndpoint(format!("{}: {}", raw, e)))
}
