//! Catalog call errors.

use thiserror::Error;

use crate::group::Cancelled;

/// Error returned by a catalog collaborator.
///
/// Only [`CatalogError::NotEnoughResults`] is a soft, per-record outcome;
/// every other variant aborts the batch.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The search (or id lookup) matched nothing.
    #[error("not enough results")]
    NotEnoughResults,
    /// The request was abandoned because the caller's token fired.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u32, body: String },
    /// Connection, TLS, timeout or other transfer failure.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },
    /// Failed to configure the curl handle.
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    /// The response body was not the JSON we expected.
    #[error("decoding response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    /// A configured base URL cannot be used to build request URLs.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// The blocking HTTP worker task failed to complete.
    #[error("HTTP worker: {0}")]
    Worker(String),
}

impl CatalogError {
    /// True for the "no match" outcome that is reported instead of aborting.
    pub fn is_soft(&self) -> bool {
        matches!(self, CatalogError::NotEnoughResults)
    }

    /// HTTP status for [`CatalogError::Status`].
    pub fn status(&self) -> Option<u32> {
        match self {
            CatalogError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
