//! Per-post reentrancy guard.
//!
//! Registering an attachment makes the media library fire another save event
//! for the same post, which would start a second fetch for an image that is
//! already on its way. The guard admits one run per post at a time and hands
//! the caller a token that releases the claim on drop, so an early return or
//! a failed step can never leave a post permanently locked.

use crate::models::PostId;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct FetchGuard {
    in_flight: Mutex<HashSet<PostId>>,
}

impl FetchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a run holds a token for `post`.
    pub fn is_fetching(&self, post: PostId) -> bool {
        self.in_flight.lock().unwrap().contains(&post)
    }

    /// Atomically claim `post`, or return `None` when a run is already in
    /// flight for it.
    pub fn try_begin(&self, post: PostId) -> Option<FetchToken<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if in_flight.insert(post) {
            Some(FetchToken { guard: self, post })
        } else {
            None
        }
    }
}

/// Claim on a single post, released when dropped.
#[derive(Debug)]
pub struct FetchToken<'a> {
    guard: &'a FetchGuard,
    post: PostId,
}

impl Drop for FetchToken<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.lock().unwrap().remove(&self.post);
    }
}
