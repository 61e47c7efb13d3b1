use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::cache::now_millis;
use crate::languages::LangCode;
use crate::store::BlobStore;
use crate::translations::TranslationResult;

pub const HISTORY_LIMIT: usize = 50;
pub(crate) const HISTORY_BLOB_KEY: &str = "translation_history";

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub timestamp: u64,
    pub original_text: String,
    pub source_lang: LangCode,
    pub results: TranslationResult,
}

impl HistoryItem {
    pub fn new(original_text: &str, results: TranslationResult) -> Self {
        let timestamp = now_millis();
        let sequence = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let seed = format!("{}:{}:{}", timestamp, sequence, original_text);
        Self {
            id: format!("{:x}", md5::compute(seed.as_bytes())),
            timestamp,
            original_text: original_text.to_string(),
            source_lang: results.detected_language,
            results,
        }
    }
}

/// Newest-first list of past translations, persisted whole on every change.
pub struct HistoryLog {
    store: Arc<dyn BlobStore>,
    items: Vec<HistoryItem>,
}

impl HistoryLog {
    pub fn load(store: Arc<dyn BlobStore>) -> Self {
        let items = match store.read(HISTORY_BLOB_KEY) {
            Ok(Some(content)) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!("translation history is corrupt, starting empty: {}", err);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("failed to read translation history: {:#}", err);
                Vec::new()
            }
        };
        Self { store, items }
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Prepends `item` unless an equivalent entry exists. Returns whether
    /// the list changed.
    pub fn append(&mut self, item: HistoryItem) -> bool {
        if self.is_duplicate(&item) {
            debug!("history already holds '{}'", item.original_text.trim());
            return false;
        }
        self.items.insert(0, item);
        self.items.truncate(HISTORY_LIMIT);
        self.persist();
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() != before;
        self.persist();
        removed
    }

    /// Drops every entry. Callers confirm with the user first.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    fn is_duplicate(&self, item: &HistoryItem) -> bool {
        let text = normalize_text(&item.original_text);
        let Ok(results) = serde_json::to_string(&item.results) else {
            return false;
        };
        self.items.iter().any(|existing| {
            normalize_text(&existing.original_text) == text
                && serde_json::to_string(&existing.results).ok().as_deref()
                    == Some(results.as_str())
        })
    }

    fn persist(&self) {
        let content = match serde_json::to_string(&self.items) {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to serialize translation history: {}", err);
                return;
            }
        };
        if let Err(err) = self.store.write(HISTORY_BLOB_KEY, &content) {
            warn!("failed to persist translation history: {:#}", err);
        }
    }
}

fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};
    use tempfile::tempdir;

    fn result(en: &str) -> TranslationResult {
        TranslationResult {
            detected_language: LangCode::Vi,
            en: Some(en.to_string()),
            jp: None,
            zh: None,
            mm: None,
            vi: Some("xin chào".to_string()),
        }
    }

    #[test]
    fn duplicate_append_is_a_no_op() {
        let mut history = HistoryLog::load(Arc::new(MemoryStore::new()));
        assert!(history.append(HistoryItem::new("Xin chào", result("hello"))));
        assert!(!history.append(HistoryItem::new("  xin CHÀO ", result("hello"))));
        assert_eq!(history.len(), 1);
        assert!(history.append(HistoryItem::new("xin chào", result("hi"))));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn cap_drops_oldest_and_keeps_newest_first() {
        let mut history = HistoryLog::load(Arc::new(MemoryStore::new()));
        for index in 0..HISTORY_LIMIT {
            history.append(HistoryItem::new(&format!("text {}", index), result("x")));
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.items()[HISTORY_LIMIT - 1].original_text, "text 0");

        history.append(HistoryItem::new("text new", result("x")));
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.items()[0].original_text, "text new");
        assert_eq!(history.items()[HISTORY_LIMIT - 1].original_text, "text 1");
        assert!(
            history
                .items()
                .iter()
                .all(|item| item.original_text != "text 0")
        );
    }

    #[test]
    fn remove_and_clear_persist() {
        let dir = tempdir().expect("tempdir");
        let store: Arc<dyn BlobStore> = Arc::new(FileStore::new(dir.path()));
        let mut history = HistoryLog::load(store.clone());
        let first = HistoryItem::new("one", result("1"));
        let first_id = first.id.clone();
        history.append(first);
        history.append(HistoryItem::new("two", result("2")));

        assert!(history.remove(&first_id));
        assert!(!history.remove("missing"));
        let reloaded = HistoryLog::load(store.clone());
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.items()[0].original_text, "two");

        history.clear();
        assert!(HistoryLog::load(store).is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let a = HistoryItem::new("same", result("x"));
        let b = HistoryItem::new("same", result("x"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.source_lang, LangCode::Vi);
    }

    #[test]
    fn persisted_layout_uses_camel_case() {
        let store = Arc::new(MemoryStore::new());
        let mut history = HistoryLog::load(store.clone());
        history.append(HistoryItem::new("hi", result("hi")));
        let blob = store.read(HISTORY_BLOB_KEY).unwrap().unwrap();
        assert!(blob.starts_with("[{\"id\":"));
        assert!(blob.contains("\"originalText\":\"hi\""));
        assert!(blob.contains("\"sourceLang\":\"vi\""));
    }
}
