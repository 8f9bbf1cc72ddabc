//! Download and PNG conversion.

use super::{NormalizeService, StagedImage};
use crate::{Error, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ImageNormalizer {
    client: Client,
    staging_dir: PathBuf,
}

impl ImageNormalizer {
    pub fn new(staging_dir: &Path) -> Result<Self> {
        Self::new_with_client(staging_dir, Client::new())
    }

    /// Build on a shared connection pool.
    pub fn new_with_client(staging_dir: &Path, client: Client) -> Result<Self> {
        std::fs::create_dir_all(staging_dir)?;
        Ok(Self {
            client,
            staging_dir: staging_dir.to_path_buf(),
        })
    }

    async fn download(&self, source_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(source_url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to download image from URL: {}", source_url);
                Error::DownloadFailure(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Image download returned status {}", status);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::DownloadFailure(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    fn encode_png(image: DynamicImage, path: &Path) -> Result<()> {
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| Error::EncodeFailure(e.to_string()))
    }
}

#[async_trait]
impl NormalizeService for ImageNormalizer {
    async fn normalize(&self, source_url: &str) -> Result<StagedImage> {
        let data = self.download(source_url).await?;

        // The source format is sniffed from the bytes, never trusted from
        // response headers. Diagnostic only; the decoder sniffs again.
        match image::guess_format(&data) {
            Ok(format) => debug!("Downloaded image format: {}", format.to_mime_type()),
            Err(_) => debug!("Downloaded image format could not be detected"),
        }

        let decoded = image::load_from_memory(&data)
            .map_err(|e| Error::DecodeFailure(e.to_string()))?;

        let path = self.staging_dir.join(format!("{}.png", Uuid::new_v4()));

        let staged_path = path.clone();
        tokio::task::spawn_blocking(move || Self::encode_png(decoded, &staged_path))
            .await
            .map_err(|e| Error::EncodeFailure(format!("PNG encode task failed: {}", e)))??;

        debug!("Staged PNG at {}", path.display());

        Ok(StagedImage {
            path,
            mime_type: "image/png".to_string(),
        })
    }
}
