//! Pipeline orchestration.
//!
//! Wires the gate, photo search, normalizer, and attacher into one run per
//! qualifying save event: search Unsplash for the post title, stage the
//! photo as PNG, attach it as the featured image. Steps run strictly in
//! sequence and the first failure aborts the run.

use crate::attach::FeaturedImageAttacher;
use crate::events::{PostSaved, SavePostListener};
use crate::guard::FetchGuard;
use crate::image::NormalizeService;
use crate::media::MediaLibrary;
use crate::models::{AttachmentId, PostContext, PostId};
use crate::settings::{SettingsStore, API_KEY_SETTING};
use crate::trigger;
use crate::unsplash::PhotoSearchService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Everything a pipeline needs from its host.
pub struct PipelineServices {
    pub settings: Arc<dyn SettingsStore>,
    pub search: Arc<dyn PhotoSearchService>,
    pub normalizer: Arc<dyn NormalizeService>,
    pub media: Arc<dyn MediaLibrary>,
}

pub struct FeaturedImagePipeline {
    settings: Arc<dyn SettingsStore>,
    search: Arc<dyn PhotoSearchService>,
    normalizer: Arc<dyn NormalizeService>,
    attacher: FeaturedImageAttacher,
    guard: FetchGuard,
}

impl FeaturedImagePipeline {
    pub fn with_services(services: PipelineServices) -> Self {
        Self {
            settings: services.settings,
            search: services.search,
            normalizer: services.normalizer,
            attacher: FeaturedImageAttacher::new(services.media),
            guard: FetchGuard::new(),
        }
    }

    /// True while a run for `post` is in flight.
    pub fn is_fetching(&self, post: PostId) -> bool {
        self.guard.is_fetching(post)
    }

    /// The fetch itself, independent of event wiring. Fails fast: the first
    /// failing step ends the run and the post is left untouched.
    pub async fn run(&self, post: &PostContext) -> Result<AttachmentId> {
        if post.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }

        // Read per run; the host may change the key between saves.
        let api_key = self
            .settings
            .get(API_KEY_SETTING)
            .filter(|key| !key.is_empty())
            .ok_or(Error::MissingCredential)?;

        if post.has_featured_image {
            return Err(Error::AlreadyHasImage(post.id));
        }

        let candidate = self.search.locate(&post.title, &api_key).await?;
        debug!(
            "Located image for \"{}\": {}",
            post.title, candidate.source_url
        );

        let staged = self.normalizer.normalize(&candidate.source_url).await?;

        let attached = self.attacher.attach(post.id, &staged).await;

        // The staged copy is spent once the attach attempt ran, on either
        // outcome.
        if let Err(e) = std::fs::remove_file(&staged.path) {
            warn!(
                "Could not remove staged file {}: {}",
                staged.path.display(),
                e
            );
        }

        attached
    }
}

#[async_trait]
impl SavePostListener for FeaturedImagePipeline {
    async fn on_post_saved(&self, event: &PostSaved) {
        let reentrant = self.guard.is_fetching(event.post.id);
        if !trigger::should_run(event, reentrant) {
            return;
        }

        // The gate's reentrancy flag is advisory; the token claim decides.
        let _token = match self.guard.try_begin(event.post.id) {
            Some(token) => token,
            None => {
                debug!("Fetch already in flight for post {}", event.post.id);
                return;
            }
        };

        match self.run(&event.post).await {
            Ok(attachment) => debug!(
                "Attached featured image {} to post {}",
                attachment, event.post.id
            ),
            Err(e) => error!("Image fetch failed for post {}: {}", event.post.id, e),
        }
    }
}
