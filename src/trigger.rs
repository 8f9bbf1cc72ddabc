//! Trigger gate for save events.
//!
//! Decides whether a save should start the image fetch at all. The checks
//! run in a fixed order: revision saves, non-post content, reentrant saves,
//! and non-draft statuses are skipped silently; a draft with an empty title
//! is skipped with a warning.

use crate::events::PostSaved;
use crate::models::{PostStatus, PostType};
use tracing::warn;

/// Pure predicate over the event plus the current reentrancy state.
pub fn should_run(event: &PostSaved, reentrant: bool) -> bool {
    if event.is_revision
        || event.post.post_type != PostType::Post
        || reentrant
        || event.post.status != PostStatus::Draft
    {
        return false;
    }

    if event.post.title.trim().is_empty() {
        warn!("Post title is empty. Skipping image fetch.");
        return false;
    }

    true
}
