//! Anonymous read of the published catalog.
//!
//! Launchers read the raw file rather than going through the API. The raw
//! host sits behind a CDN, so a check can append a throwaway `_=<millis>`
//! query parameter to force a fresh copy.

use std::time::Duration;

use tracing::debug;

use super::model::CatalogDocument;
use crate::constants::METADATA_TIMEOUT;
use crate::core::{LauncherError, Result};

/// Reads the catalog from its public URL.
#[derive(Debug, Clone)]
pub struct PublicCatalog {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl PublicCatalog {
    /// Reader for `url`.
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: METADATA_TIMEOUT,
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Catalog URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and parse the catalog.
    pub async fn fetch(&self, cache_bust: bool) -> Result<CatalogDocument> {
        let url = if cache_bust {
            cache_busted(&self.url, chrono::Utc::now().timestamp_millis())
        } else {
            self.url.clone()
        };
        debug!("Fetching catalog from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LauncherError::from_reqwest("fetching catalog", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| LauncherError::from_reqwest("reading catalog", e))?;
        CatalogDocument::from_json(&text)
    }
}

fn cache_busted(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_={millis}")
}
