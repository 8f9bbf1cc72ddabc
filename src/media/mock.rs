//! In-memory media library for testing.

use super::{MediaLibrary, UploadDir};
use crate::models::{AttachmentId, AttachmentMeta, AttachmentMetadata, PostId};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Media operation a test wants to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOp {
    Put,
    Insert,
    Metadata,
    SetFeatured,
}

#[derive(Debug, Clone)]
pub struct MockAttachment {
    pub id: AttachmentId,
    pub parent: PostId,
    pub file: PathBuf,
    pub meta: AttachmentMeta,
    pub metadata: Option<AttachmentMetadata>,
}

/// Mock implementation of `MediaLibrary`. Promoted files live in an
/// in-memory map; staged files are read from the real filesystem so the
/// mock composes with normalizers that stage actual PNGs.
#[derive(Clone)]
pub struct MockMediaLibrary {
    upload_path: PathBuf,
    base_dir: PathBuf,
    dir_available: Arc<Mutex<bool>>,
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    puts: Arc<Mutex<Vec<(PathBuf, u32)>>>,
    attachments: Arc<Mutex<Vec<MockAttachment>>>,
    featured: Arc<Mutex<HashMap<PostId, AttachmentId>>>,
    next_id: Arc<Mutex<u64>>,
    fail_on: Arc<Mutex<Option<MediaOp>>>,
}

impl MockMediaLibrary {
    pub fn new() -> Self {
        Self {
            upload_path: PathBuf::from("/uploads/2024/06"),
            base_dir: PathBuf::from("/uploads"),
            dir_available: Arc::new(Mutex::new(true)),
            files: Arc::new(Mutex::new(HashMap::new())),
            puts: Arc::new(Mutex::new(Vec::new())),
            attachments: Arc::new(Mutex::new(Vec::new())),
            featured: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            fail_on: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_dir_available(self, available: bool) -> Self {
        *self.dir_available.lock().unwrap() = available;
        self
    }

    pub fn with_failure_on(self, op: MediaOp) -> Self {
        *self.fail_on.lock().unwrap() = Some(op);
        self
    }

    fn should_fail(&self, op: MediaOp) -> bool {
        *self.fail_on.lock().unwrap() == Some(op)
    }

    /// `(path, mode)` pairs stored so far.
    pub fn puts(&self) -> Vec<(PathBuf, u32)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn insert_count(&self) -> usize {
        self.attachments.lock().unwrap().len()
    }

    pub fn attachments(&self) -> Vec<MockAttachment> {
        self.attachments.lock().unwrap().clone()
    }

    pub fn stored_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

impl Default for MockMediaLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaLibrary for MockMediaLibrary {
    fn upload_dir(&self) -> UploadDir {
        UploadDir {
            path: self.upload_path.clone(),
            base_dir: self.base_dir.clone(),
        }
    }

    async fn ensure_dir(&self, _path: &Path) -> bool {
        *self.dir_available.lock().unwrap()
    }

    async fn get_contents(&self, path: &Path) -> Result<Vec<u8>> {
        if let Some(data) = self.files.lock().unwrap().get(path) {
            return Ok(data.clone());
        }
        Ok(std::fs::read(path)?)
    }

    async fn put_contents(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        if self.should_fail(MediaOp::Put) {
            return Err(Error::Io(std::io::Error::other("mock put failure")));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), data.to_vec());
        self.puts.lock().unwrap().push((path.to_path_buf(), mode));
        Ok(())
    }

    async fn insert_attachment(
        &self,
        meta: AttachmentMeta,
        file: &Path,
        parent: PostId,
    ) -> Result<AttachmentId> {
        if self.should_fail(MediaOp::Insert) {
            return Err(Error::Io(std::io::Error::other("mock insert failure")));
        }
        let mut next_id = self.next_id.lock().unwrap();
        let id = AttachmentId(*next_id);
        *next_id += 1;
        self.attachments.lock().unwrap().push(MockAttachment {
            id,
            parent,
            file: file.to_path_buf(),
            meta,
            metadata: None,
        });
        Ok(id)
    }

    async fn generate_metadata(
        &self,
        _attachment: AttachmentId,
        file: &Path,
    ) -> Result<AttachmentMetadata> {
        if self.should_fail(MediaOp::Metadata) {
            return Err(Error::Io(std::io::Error::other("mock metadata failure")));
        }
        let (width, height) = match self.get_contents(file).await {
            Ok(bytes) => image::load_from_memory(&bytes)
                .map(|img| (img.width(), img.height()))
                .unwrap_or((0, 0)),
            Err(_) => (0, 0),
        };
        Ok(AttachmentMetadata {
            file: file.to_string_lossy().into_owned(),
            width,
            height,
        })
    }

    async fn update_attachment_metadata(
        &self,
        attachment: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> Result<()> {
        let mut attachments = self.attachments.lock().unwrap();
        let record = attachments
            .iter_mut()
            .find(|record| record.id == attachment)
            .ok_or_else(|| Error::AttachFailure(format!("unknown attachment {}", attachment)))?;
        record.metadata = Some(metadata.clone());
        Ok(())
    }

    async fn set_featured_image(&self, post: PostId, attachment: AttachmentId) -> Result<()> {
        if self.should_fail(MediaOp::SetFeatured) {
            return Err(Error::Io(std::io::Error::other(
                "mock set featured failure",
            )));
        }
        self.featured.lock().unwrap().insert(post, attachment);
        Ok(())
    }

    async fn featured_image(&self, post: PostId) -> Option<AttachmentId> {
        self.featured.lock().unwrap().get(&post).copied()
    }
}
