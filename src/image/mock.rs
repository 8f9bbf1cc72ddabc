use super::{NormalizeService, StagedImage};
use crate::{Error, Result};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock normalizer that skips the download and stages a real one-pixel PNG,
/// so code downstream can read the file it reports.
#[derive(Clone)]
pub struct MockNormalizer {
    staging_dir: PathBuf,
    sources: Arc<Mutex<Vec<String>>>,
    staged: Arc<Mutex<Vec<PathBuf>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockNormalizer {
    pub fn new() -> Self {
        Self {
            staging_dir: std::env::temp_dir(),
            sources: Arc::new(Mutex::new(Vec::new())),
            staged: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_staging_dir(mut self, dir: &Path) -> Self {
        self.staging_dir = dir.to_path_buf();
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn normalize_count(&self) -> usize {
        self.sources.lock().unwrap().len()
    }

    /// Source URLs seen so far.
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }

    /// Paths of every PNG this mock has staged.
    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }
}

impl Default for MockNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NormalizeService for MockNormalizer {
    async fn normalize(&self, source_url: &str) -> Result<StagedImage> {
        self.sources.lock().unwrap().push(source_url.to_string());

        if *self.should_fail.lock().unwrap() {
            return Err(Error::DecodeFailure("mock decode failure".to_string()));
        }

        let path = self.staging_dir.join(format!("{}.png", Uuid::new_v4()));
        let pixel = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        pixel
            .save(&path)
            .map_err(|e| Error::EncodeFailure(e.to_string()))?;

        self.staged.lock().unwrap().push(path.clone());

        Ok(StagedImage {
            path,
            mime_type: "image/png".to_string(),
        })
    }
}
