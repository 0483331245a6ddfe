//! On-disk avatar cache keyed by sanitized owner name.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::constants::CRAWLER_USER_AGENT;
use crate::error::FetchError;

/// Where an avatar can be rendered from.
///
/// Resolution yields a cached file when possible and falls back to a remote
/// URL when it is not; callers must handle both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AvatarRef {
    Local(PathBuf),
    Remote(String),
}

/// Permanent on-disk image cache, one file per sanitized owner name.
///
/// Entries are never invalidated or refreshed; a name that has a file keeps
/// it for every later session. Concurrent resolution of the same name may
/// race to write the same path, which is benign since the content per owner
/// is identical.
#[derive(Debug)]
pub struct AvatarCache {
    dir: PathBuf,
    http: reqwest::Client,
    default_url: String,
}

impl AvatarCache {
    /// Build a cache over `config.avatar_dir`.
    ///
    /// The directory itself is created by the caller before any resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build avatar HTTP client")?;
        Ok(Self {
            dir: config.avatar_dir.clone(),
            http,
            default_url: config.default_avatar_url.clone(),
        })
    }

    /// Map an owner name to a filesystem-safe file stem.
    ///
    /// Every character outside ASCII alphanumerics, underscore, and the CJK
    /// unified ideograph block collapses to `_`. Names that sanitize to
    /// nothing become a single `_` so the stem is never empty.
    #[must_use]
    pub fn sanitize_owner(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || ('\u{4e00}'..='\u{9fff}').contains(&c) {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.is_empty() {
            "_".to_string()
        } else {
            cleaned
        }
    }

    /// Cache path for an owner name.
    #[must_use]
    pub fn path_for(&self, owner: &str) -> PathBuf {
        self.dir.join(format!("{}.png", Self::sanitize_owner(owner)))
    }

    /// Resolve an avatar to something renderable.
    ///
    /// An existing cache file is returned without touching the network. An
    /// absent or empty `remote_url` substitutes the configured default URL.
    /// Any download or write failure degrades to [`AvatarRef::Remote`] with
    /// the default URL rather than propagating.
    pub async fn resolve(&self, remote_url: Option<&str>, owner: &str) -> AvatarRef {
        let path = self.path_for(owner);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return AvatarRef::Local(path);
        }

        let url = remote_url
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.default_url);

        match self.download(url, &path).await {
            Ok(()) => AvatarRef::Local(path),
            Err(err) => {
                debug!(owner, error = %err, "avatar download failed, using remote fallback");
                AvatarRef::Remote(self.default_url.clone())
            }
        }
    }

    async fn download(&self, url: &str, path: &Path) -> Result<(), FetchError> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, CRAWLER_USER_AGENT)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| FetchError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(())
    }
}
