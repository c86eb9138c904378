//! Read access to the requests captured by the interception layer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tempo_common::request::CapturedRequest;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read capture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse capture file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the template filed under `key`, if one was captured.
    async fn get(&self, key: &str) -> Option<CapturedRequest>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, CapturedRequest>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, request: CapturedRequest) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), request);
        }
    }

    pub fn remove(&self, key: &str) -> Option<CapturedRequest> {
        self.entries.write().ok()?.remove(key)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<CapturedRequest> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

/// Captures exported as a JSON object of `key -> request`.
#[derive(Debug, Clone, Default)]
pub struct JsonFileStore {
    entries: HashMap<String, CapturedRequest>,
}

impl JsonFileStore {
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        let entries: HashMap<String, CapturedRequest> = serde_json::from_str(&content)?;
        tracing::info!(
            "Loaded {} captured request(s) from {}",
            entries.len(),
            path.display()
        );
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn get(&self, key: &str) -> Option<CapturedRequest> {
        self.entries.get(key).cloned()
    }
}
