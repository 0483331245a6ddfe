//! Authenticated JSON fetches against the forum API.

use anyhow::{Context, Result};
use reqwest::header;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::constants::CRAWLER_USER_AGENT;
use crate::error::FetchError;

/// HTTP client for the forum's JSON API.
///
/// Carries the forum base URL and, when one is configured, an opaque session
/// cookie passed through verbatim on every request.
#[derive(Debug)]
pub struct ForumClient {
    http: reqwest::Client,
    base_url: String,
    cookie: Option<String>,
}

impl ForumClient {
    /// Build a client with the configured per-request timeout.
    ///
    /// An empty cookie string counts as no cookie at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &Config, cookie: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            cookie: cookie.filter(|c| !c.is_empty()),
        })
    }

    /// GET an API path and decode the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Timeouts and connection failures surface as [`FetchError::Network`],
    /// non-2xx answers as [`FetchError::Status`], and bodies that are not the
    /// expected JSON as [`FetchError::Decode`]. Callers treat any of them as
    /// "no more pages".
    pub async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .get(&url)
            .query(query)
            .header(header::USER_AGENT, CRAWLER_USER_AGENT);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }
}
