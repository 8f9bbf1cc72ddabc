//! Unsplash photo search.
//!
//! Finds one candidate photo for a post title via the Unsplash random-photo
//! endpoint.

pub mod client;
pub mod mock;

pub use client::UnsplashClient;
pub use mock::MockPhotoSearch;

use crate::models::ImageCandidate;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PhotoSearchService: Send + Sync {
    /// Look up a random photo matching `query` and return its
    /// full-resolution URL.
    async fn locate(&self, query: &str, api_key: &str) -> Result<ImageCandidate>;
}
