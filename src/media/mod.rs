//! Media library abstraction.
//!
//! Everything the pipeline needs from the hosting CMS's media subsystem:
//! upload locations, file IO, attachment records, derived metadata, and
//! featured-image assignment.

pub mod library;
pub mod mock;

pub use library::FsMediaLibrary;
pub use mock::{MediaOp, MockMediaLibrary};

use crate::models::{AttachmentId, AttachmentMeta, AttachmentMetadata, PostId};
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Mode for files promoted into the media directory.
pub const FILE_MODE: u32 = 0o644;

/// Where uploads land: `path` is the preferred (dated) directory and
/// `base_dir` the fallback when it cannot be created.
#[derive(Debug, Clone)]
pub struct UploadDir {
    pub path: PathBuf,
    pub base_dir: PathBuf,
}

#[async_trait]
pub trait MediaLibrary: Send + Sync {
    fn upload_dir(&self) -> UploadDir;

    /// Create `path` and its parents; false when the directory cannot be
    /// made available.
    async fn ensure_dir(&self, path: &Path) -> bool;

    async fn get_contents(&self, path: &Path) -> Result<Vec<u8>>;

    async fn put_contents(&self, path: &Path, data: &[u8], mode: u32) -> Result<()>;

    /// Register a new attachment owned by `parent`. Implementations fire a
    /// save event for the new attachment record.
    async fn insert_attachment(
        &self,
        meta: AttachmentMeta,
        file: &Path,
        parent: PostId,
    ) -> Result<AttachmentId>;

    async fn generate_metadata(
        &self,
        attachment: AttachmentId,
        file: &Path,
    ) -> Result<AttachmentMetadata>;

    async fn update_attachment_metadata(
        &self,
        attachment: AttachmentId,
        metadata: &AttachmentMetadata,
    ) -> Result<()>;

    async fn set_featured_image(&self, post: PostId, attachment: AttachmentId) -> Result<()>;

    async fn featured_image(&self, post: PostId) -> Option<AttachmentId>;
}

/// MIME type inferred from the file extension alone; contents are never
/// sniffed here.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Reduce a display title to a safe file-name form: whitespace runs become
/// single dashes and anything outside `A-Za-z0-9._-` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_whitespace() {
            pending_dash = !out.is_empty();
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            if pending_dash {
                out.push('-');
                pending_dash = false;
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(
            mime_from_extension(Path::new("photo.png")),
            Some("image/png")
        );
        assert_eq!(
            mime_from_extension(Path::new("photo.JPG")),
            Some("image/jpeg")
        );
        assert_eq!(
            mime_from_extension(Path::new("photo.jpeg")),
            Some("image/jpeg")
        );
        assert_eq!(mime_from_extension(Path::new("photo.txt")), None);
        assert_eq!(mime_from_extension(Path::new("photo")), None);
    }

    #[test]
    fn test_sanitize_file_name_collapses_whitespace() {
        assert_eq!(sanitize_file_name("mountain  sunrise.png"), "mountain-sunrise.png");
        assert_eq!(sanitize_file_name("  padded name  "), "padded-name");
    }

    #[test]
    fn test_sanitize_file_name_drops_special_characters() {
        assert_eq!(sanitize_file_name("a/b\\c:d.png"), "abcd.png");
        assert_eq!(sanitize_file_name("café.png"), "caf.png");
    }

    #[test]
    fn test_sanitize_file_name_keeps_safe_characters() {
        assert_eq!(
            sanitize_file_name("d4f2b1aa-1c2d-4e5f-8a9b-0c1d2e3f4a5b.png"),
            "d4f2b1aa-1c2d-4e5f-8a9b-0c1d2e3f4a5b.png"
        );
    }
}
