//! Mock photo search for testing.

use super::PhotoSearchService;
use crate::models::ImageCandidate;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mock implementation of `PhotoSearchService` that records calls and can be
/// held open mid-flight for concurrency tests.
#[derive(Clone, Default)]
pub struct MockPhotoSearch {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    should_fail: Arc<Mutex<bool>>,
    hold: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl MockPhotoSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a candidate URL; queued URLs are served in rotation.
    pub fn with_candidate(self, url: &str) -> Self {
        self.responses.lock().unwrap().push(url.to_string());
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Park every `locate` call (after recording it) until the gate is
    /// notified.
    pub fn with_hold(self, gate: Arc<Notify>) -> Self {
        *self.hold.lock().unwrap() = Some(gate);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The `(query, api_key)` pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoSearchService for MockPhotoSearch {
    async fn locate(&self, query: &str, api_key: &str) -> Result<ImageCandidate> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), api_key.to_string()));

        let gate = self.hold.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if *self.should_fail.lock().unwrap() {
            return Err(Error::NetworkFailure("mock network failure".to_string()));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(ImageCandidate {
                source_url: "https://images.example/mock-photo.jpg".to_string(),
            })
        } else {
            let index = (self.calls.lock().unwrap().len() - 1) % responses.len();
            Ok(ImageCandidate {
                source_url: responses[index].clone(),
            })
        }
    }
}
