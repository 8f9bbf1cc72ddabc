//! Image download and PNG normalization.
//!
//! Downloads the located photo and re-encodes it as PNG into the staging
//! directory, whatever raster format the source served.

pub mod mock;
pub mod normalizer;

pub use mock::MockNormalizer;
pub use normalizer::ImageNormalizer;

use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// A PNG staged on local disk, ready to be promoted into the media library.
pub struct StagedImage {
    pub path: PathBuf,
    pub mime_type: String,
}

#[async_trait]
pub trait NormalizeService: Send + Sync {
    async fn normalize(&self, source_url: &str) -> Result<StagedImage>;
}
