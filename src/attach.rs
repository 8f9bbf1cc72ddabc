//! Featured image attachment.
//!
//! Takes a staged PNG, copies it into the media library's upload directory,
//! registers it as an attachment of the post, records derived metadata, and
//! marks it as the post's featured image. The steps run strictly in that
//! order and the first failure aborts the rest.

use crate::image::StagedImage;
use crate::media::{mime_from_extension, sanitize_file_name, MediaLibrary, FILE_MODE};
use crate::models::{AttachmentId, AttachmentMeta, AttachmentStatus, PostId};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub struct FeaturedImageAttacher {
    media: Arc<dyn MediaLibrary>,
}

impl FeaturedImageAttacher {
    pub fn new(media: Arc<dyn MediaLibrary>) -> Self {
        Self { media }
    }

    pub async fn attach(&self, post: PostId, staged: &StagedImage) -> Result<AttachmentId> {
        let filename = staged
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::AttachFailure(format!(
                    "staged file has no usable name: {}",
                    staged.path.display()
                ))
            })?;

        let upload_dir = self.media.upload_dir();
        let destination = if self.media.ensure_dir(&upload_dir.path).await {
            upload_dir.path.join(filename)
        } else {
            upload_dir.base_dir.join(filename)
        };

        let data = self
            .media
            .get_contents(&staged.path)
            .await
            .map_err(|e| Error::AttachFailure(format!("could not read staged file: {}", e)))?;

        self.media
            .put_contents(&destination, &data, FILE_MODE)
            .await
            .map_err(|e| {
                Error::AttachFailure(format!("could not store image in media dir: {}", e))
            })?;

        let meta = AttachmentMeta {
            mime_type: mime_from_extension(&destination)
                .unwrap_or("application/octet-stream")
                .to_string(),
            title: sanitize_file_name(filename),
            description: String::new(),
            status: AttachmentStatus::Inherit,
        };

        let attachment = self
            .media
            .insert_attachment(meta, &destination, post)
            .await
            .map_err(|e| Error::AttachFailure(format!("could not register attachment: {}", e)))?;
        debug!(
            "Registered attachment {} at {}",
            attachment,
            destination.display()
        );

        let metadata = self
            .media
            .generate_metadata(attachment, &destination)
            .await
            .map_err(|e| {
                Error::AttachFailure(format!("could not generate attachment metadata: {}", e))
            })?;
        self.media
            .update_attachment_metadata(attachment, &metadata)
            .await
            .map_err(|e| {
                Error::AttachFailure(format!("could not record attachment metadata: {}", e))
            })?;

        self.media
            .set_featured_image(post, attachment)
            .await
            .map_err(|e| Error::AttachFailure(format!("could not set featured image: {}", e)))?;
        info!("Featured image set for post ID: {}", post);

        Ok(attachment)
    }
}
