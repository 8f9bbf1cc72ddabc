//! Data models and structures
//!
//! Defines the core data structures for posts, attachments, and host
//! configuration shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Post,
    Page,
    Attachment,
}

/// Snapshot of a post as the host saw it at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostContext {
    pub id: PostId,
    pub title: String,
    pub status: PostStatus,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub has_featured_image: bool,
}

impl PostContext {
    /// A plain draft post with no featured image.
    pub fn draft(id: u64, title: &str) -> Self {
        Self {
            id: PostId(id),
            title: title.to_string(),
            status: PostStatus::Draft,
            post_type: PostType::Post,
            has_featured_image: false,
        }
    }
}

/// Remote photo selected for a post, identified by its full-resolution URL.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub source_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    Inherit,
    Private,
}

/// Registration fields for a new media attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub mime_type: String,
    pub title: String,
    pub description: String,
    pub status: AttachmentStatus,
}

/// Derived attachment data recorded after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    pub file: String,
    pub width: u32,
    pub height: u32,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub media_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            api_key: std::env::var("UNSPLASH_ACCESS_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            media_root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
        }
    }
}
