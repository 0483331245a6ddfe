//! Session cookie persistence.
//!
//! The forum accepts an opaque session cookie. It is stored verbatim in a
//! small JSON file (`{"cookie": "<string>"}`) and attached to requests
//! unchanged; nothing here parses or validates cookie syntax.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieFile {
    #[serde(default)]
    cookie: String,
}

/// Load the saved session cookie.
///
/// A missing, unreadable, or malformed file means no cookie: requests then go
/// out anonymously, which the API accepts for public listings.
pub async fn load_cookie(path: &Path) -> Option<String> {
    let bytes = tokio::fs::read(path).await.ok()?;
    let parsed: CookieFile = serde_json::from_slice(&bytes).ok()?;
    if parsed.cookie.is_empty() {
        None
    } else {
        Some(parsed.cookie)
    }
}

/// Persist the session cookie for later runs.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_cookie(path: &Path, cookie: &str) -> Result<()> {
    let contents = serde_json::to_vec_pretty(&CookieFile {
        cookie: cookie.to_string(),
    })
    .context("Failed to encode cookie file")?;
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write cookie file: {}", path.display()))?;
    Ok(())
}
