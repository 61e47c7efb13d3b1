use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::languages::TargetLanguages;
use crate::store::BlobStore;
use crate::translations::TranslationResult;

pub const CACHE_CAPACITY: usize = 100;
pub(crate) const CACHE_BLOB_KEY: &str = "translation_cache";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: TranslationResult,
    pub timestamp: u64,
}

/// `"<trimmed lowercase text>_to_<sorted codes csv>"`.
pub fn cache_key(text: &str, targets: &TargetLanguages) -> String {
    format!(
        "{}_to_{}",
        text.trim().to_lowercase(),
        targets.sorted_csv()
    )
}

/// Exact-match response cache persisted as one JSON blob. Eviction drops
/// the oldest inserted entry; lookups never refresh timestamps.
pub struct ResponseCache {
    store: Arc<dyn BlobStore>,
    entries: BTreeMap<String, CacheEntry>,
    capacity: usize,
}

impl ResponseCache {
    /// Reads the persisted blob. Unreadable or corrupt data yields an empty
    /// cache.
    pub fn load(store: Arc<dyn BlobStore>) -> Self {
        let entries = match store.read(CACHE_BLOB_KEY) {
            Ok(Some(content)) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("translation cache is corrupt, starting empty: {}", err);
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!("failed to read translation cache: {:#}", err);
                BTreeMap::new()
            }
        };
        Self {
            store,
            entries,
            capacity: CACHE_CAPACITY,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TranslationResult> {
        self.entries.get(key).map(|entry| &entry.result)
    }

    pub fn put(&mut self, key: String, result: TranslationResult) {
        self.put_at(key, result, now_millis());
    }

    pub(crate) fn put_at(&mut self, key: String, result: TranslationResult, timestamp: u64) {
        self.entries.insert(key, CacheEntry { result, timestamp });
        if self.entries.len() > self.capacity {
            self.evict_oldest();
        }
        self.persist();
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.timestamp)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!("evicting cache entry '{}'", key);
            self.entries.remove(&key);
        }
    }

    fn persist(&self) {
        let content = match serde_json::to_string(&self.entries) {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to serialize translation cache: {}", err);
                return;
            }
        };
        if let Err(err) = self.store.write(CACHE_BLOB_KEY, &content) {
            warn!("failed to persist translation cache: {:#}", err);
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
