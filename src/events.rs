//! Save-event dispatch.
//!
//! The seam between the hosting CMS and the pipeline: the host emits a
//! [`PostSaved`] event for every content save (revisions and attachment
//! inserts included) and registered listeners react to it.

use crate::models::PostContext;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A content save as delivered by the host.
#[derive(Debug, Clone)]
pub struct PostSaved {
    pub post: PostContext,
    /// True when the save wrote an autosave revision rather than the post
    /// itself.
    pub is_revision: bool,
}

impl PostSaved {
    /// A direct save of the post itself.
    pub fn primary(post: PostContext) -> Self {
        Self {
            post,
            is_revision: false,
        }
    }

    /// The revision save the host fires alongside a direct save.
    pub fn revision(post: PostContext) -> Self {
        Self {
            post,
            is_revision: true,
        }
    }
}

#[async_trait]
pub trait SavePostListener: Send + Sync {
    async fn on_post_saved(&self, event: &PostSaved);
}

/// Minimal hook registry. Listeners run sequentially in registration order;
/// a listener must not fail the dispatch, so the callback is infallible.
#[derive(Default)]
pub struct SavePostHooks {
    listeners: Mutex<Vec<Arc<dyn SavePostListener>>>,
}

impl SavePostHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn SavePostListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    pub async fn emit(&self, event: &PostSaved) {
        let listeners: Vec<_> = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_post_saved(event).await;
        }
    }
}
