//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use crate::models::PostId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsplash API key is not set")]
    MissingCredential,

    #[error("Post {0} already has a featured image")]
    AlreadyHasImage(PostId),

    #[error("Post title is empty")]
    EmptyTitle,

    #[error("Unsplash API request error: {0}")]
    NetworkFailure(String),

    #[error("Unsplash API response does not contain image URL. Response: {0}")]
    MalformedResponse(String),

    #[error("Failed to download image: {0}")]
    DownloadFailure(String),

    #[error("Failed to decode image data: {0}")]
    DecodeFailure(String),

    #[error("Failed to save PNG image: {0}")]
    EncodeFailure(String),

    #[error("Failed to attach image: {0}")]
    AttachFailure(String),
}

pub type Result<T> = std::result::Result<T, Error>;
