use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// A failed fetch or cache write.
///
/// Crawl code never aborts on one of these: a failure means "stop collecting
/// further pages" and whatever was already collected stands.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("undecodable response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
