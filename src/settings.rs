//! Host settings surface.
//!
//! The pipeline never reaches into environment variables or an options table
//! directly; the host hands it a [`SettingsStore`] and the pipeline reads the
//! API key through it once per run.

use std::collections::HashMap;
use std::sync::Mutex;

/// Settings key holding the Unsplash API access key.
pub const API_KEY_SETTING: &str = "unsplash_api_key";

pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory settings store used by the demo host and tests.
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}
