use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ephemeral key/value store that lets callers chain requests.
/// Entries live until the process exits.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `contents` under a fresh key and return the key
    pub async fn set(&self, contents: Value) -> String {
        let key = uuid::Uuid::new_v4().to_string();
        self.entries.write().await.insert(key.clone(), contents);
        key
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }
}
