//! Filesystem-backed media library.
//!
//! Stores uploaded files under a month-partitioned directory tree and keeps
//! attachment records in a JSON registry next to them, so a restarted host
//! sees the same library.

use super::{MediaLibrary, UploadDir};
use crate::events::{PostSaved, SavePostHooks};
use crate::models::{
    AttachmentId, AttachmentMeta, AttachmentMetadata, PostContext, PostId, PostStatus, PostType,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const REGISTRY_FILE: &str = "library.json";
const UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: AttachmentId,
    pub parent: PostId,
    pub file: PathBuf,
    pub meta: AttachmentMeta,
    pub metadata: Option<AttachmentMetadata>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FeaturedEntry {
    post: PostId,
    attachment: AttachmentId,
}

#[derive(Debug, Serialize, Deserialize)]
struct Registry {
    next_id: u64,
    attachments: Vec<AttachmentRecord>,
    featured: Vec<FeaturedEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            next_id: 1,
            attachments: Vec::new(),
            featured: Vec::new(),
        }
    }
}

pub struct FsMediaLibrary {
    root: PathBuf,
    registry: Mutex<Registry>,
    hooks: Option<Arc<SavePostHooks>>,
}

impl FsMediaLibrary {
    /// Open the library rooted at `root`, creating it on first use.
    pub fn new(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let registry_path = root.join(REGISTRY_FILE);
        let registry = if registry_path.exists() {
            serde_json::from_str(&fs::read_to_string(&registry_path)?)?
        } else {
            Registry::default()
        };

        Ok(Self {
            root: root.to_path_buf(),
            registry: Mutex::new(registry),
            hooks: None,
        })
    }

    /// Fire save events for inserted attachments through `hooks`, the way a
    /// CMS re-enters its own save path.
    pub fn with_hooks(mut self, hooks: Arc<SavePostHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn attachment(&self, id: AttachmentId) -> Option<AttachmentRecord> {
        self.registry
            .lock()
            .unwrap()
            .attachments
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn attachments_for(&self, parent: PostId) -> Vec<AttachmentRecord> {
        self.registry
            .lock()
            .unwrap()
            .attachments
            .iter()
            .filter(|record| record.parent == parent)
            .cloned()
            .collect()
    }

    pub fn attachment_count(&self) -> usize {
        self.registry.lock().unwrap().attachments.len()
    }

    fn persist(&self, registry: &Registry) -> Result<()> {
        let json = serde_json::to_string_pretty(registry)?;
        fs::write(self.root.join(REGISTRY_FILE), json)?;
        Ok(())
    }
}

#[async_trait]
impl MediaLibrary for FsMediaLibrary {
    fn upload_dir(&self) -> UploadDir {
        let base_dir = self.root.join(UPLOADS_DIR);
        let path = base_dir.join(Local::now().format("%Y/%m").to_string());
        UploadDir { path, base_dir }
    }

    async fn ensure_dir(&self, path: &Path) -> bool {
        fs::create_dir_all(path).is_ok()
    }

    async fn get_contents(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    async fn put_contents(&self, path: &Path, data: &[u8], mode: u32) -> Result<()> {
        fs::write(path, data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(())
    }

    async fn insert_attachment(
        &self,
        meta: AttachmentMeta,
        file: &Path,
        parent: PostId,
    ) -> Result<AttachmentId> {
        let (id, event) = {
            let mut registry = self.registry.lock().unwrap();
            let id = AttachmentId(registry.next_id);
            registry.next_id += 1;
            registry.attachments.push(AttachmentRecord {
                id,
                parent,
                file: file.to_path_buf(),
                meta: meta.clone(),
                metadata: None,
            });
            self.persist(&registry)?;

            let event = PostSaved::primary(PostContext {
                id: PostId(id.0),
                title: meta.title,
                status: PostStatus::Other,
                post_type: PostType::Attachment,
                has_featured_image: false,
            });
            (id, event)
        };

        info!("Registered attachment {} for post {}", id, parent);

        // Inserting an attachment is itself a save; listeners see it like
        // any other.
        if let Some(hooks) = &self.hooks {
            hooks.emit(&event).await;
        }

        Ok(id)
    }

    async fn generate_metadata(
        &self,
        attachment: AttachmentId,
        file: &Path,
    ) -> Result<AttachmentMetadata> {
        let (width, height) =
            image::image_dimensions(file).map_err(|e| Error::DecodeFailure(e.to_string()))?;
        debug!(
            "Generated metadata for attachment {}: {}x{}",
            attachment, width, height
        );

        let base_dir = self.root.join(UPLOADS_DIR);
        let relative = file.strip_prefix(&base_dir).unwrap_or(file);

        Ok(AttachmentMetadata {
            file: relative.to_string_lossy().into_owned(),
            width,
            height,
        })
    }

    async fn update_attachment_metadata(
        &self,
        attachment: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> Result<()> {
        let mut registry = self.registry.lock().unwrap();
        let record = registry
            .attachments
            .iter_mut()
            .find(|record| record.id == attachment)
            .ok_or_else(|| {
                Error::AttachFailure(format!("unknown attachment {}", attachment))
            })?;
        record.metadata = Some(metadata.clone());
        self.persist(&registry)
    }

    async fn set_featured_image(&self, post: PostId, attachment: AttachmentId) -> Result<()> {
        let mut registry = self.registry.lock().unwrap();
        if let Some(entry) = registry.featured.iter_mut().find(|entry| entry.post == post) {
            entry.attachment = attachment;
        } else {
            registry.featured.push(FeaturedEntry { post, attachment });
        }
        self.persist(&registry)?;
        debug!("Featured image for post {} is attachment {}", post, attachment);
        Ok(())
    }

    async fn featured_image(&self, post: PostId) -> Option<AttachmentId> {
        self.registry
            .lock()
            .unwrap()
            .featured
            .iter()
            .find(|entry| entry.post == post)
            .map(|entry| entry.attachment)
    }
}
