//! Unsplash API client.

use super::PhotoSearchService;
use crate::models::ImageCandidate;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::error;

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RandomPhotoResponse {
    urls: Option<PhotoUrls>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    full: Option<String>,
}

pub struct UnsplashClient {
    client: Client,
    base_url: String,
}

impl UnsplashClient {
    pub fn new() -> Self {
        Self::new_with_client(Client::new())
    }

    /// Build on a shared connection pool.
    pub fn new_with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for UnsplashClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhotoSearchService for UnsplashClient {
    async fn locate(&self, query: &str, api_key: &str) -> Result<ImageCandidate> {
        let url = format!("{}/photos/random", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(SEARCH_TIMEOUT)
            .query(&[("query", query), ("client_id", api_key)])
            .send()
            .await
            .map_err(|e| {
                error!("Unsplash API request error: {}", e);
                Error::NetworkFailure(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Unsplash API returned status {}", status);
        }

        // Error responses carry a JSON or plain-text body; both fall through
        // to the parse below and surface as a malformed response.
        let body = response
            .text()
            .await
            .map_err(|e| Error::NetworkFailure(e.to_string()))?;

        match serde_json::from_str::<RandomPhotoResponse>(&body) {
            Ok(RandomPhotoResponse {
                urls: Some(PhotoUrls { full: Some(full) }),
            }) => Ok(ImageCandidate { source_url: full }),
            _ => {
                error!(
                    "Unsplash API response does not contain image URL. Response: {}",
                    body
                );
                Err(Error::MalformedResponse(body))
            }
        }
    }
}
