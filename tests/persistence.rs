use std::sync::Arc;

use ruby_translator::store::{BlobStore, FileStore};
use ruby_translator::{
    HistoryItem, HistoryLog, ResponseCache, TargetLanguages, TranslationResult, cache_key,
};
use serde_json::json;
use tempfile::tempdir;

fn result() -> TranslationResult {
    serde_json::from_value(json!({
        "detectedLanguage": "en",
        "jp": [{"text": "猫", "ruby": "ねこ"}],
        "zh": [{"text": "貓", "ruby": "māo"}]
    }))
    .unwrap()
}

#[test]
fn cache_and_history_survive_a_restart() {
    let dir = tempdir().expect("tempdir");
    let targets = TargetLanguages::parse_list("zh,jp").unwrap();
    let key = cache_key("  Cat ", &targets);
    assert_eq!(key, "cat_to_jp,zh");

    {
        let store: Arc<dyn BlobStore> = Arc::new(FileStore::new(dir.path()));
        let mut cache = ResponseCache::load(store.clone());
        let mut history = HistoryLog::load(store);
        cache.put(key.clone(), result());
        assert!(history.append(HistoryItem::new("Cat", result())));
    }

    assert!(dir.path().join("translation_cache.json").exists());
    assert!(dir.path().join("translation_history.json").exists());

    let store: Arc<dyn BlobStore> = Arc::new(FileStore::new(dir.path()));
    let cache = ResponseCache::load(store.clone());
    let history = HistoryLog::load(store);
    assert_eq!(cache.get(&key), Some(&result()));
    assert_eq!(history.len(), 1);
    assert_eq!(history.items()[0].original_text, "Cat");
}

#[test]
fn corrupt_blobs_start_empty() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("translation_cache.json"), "{not json").unwrap();
    std::fs::write(dir.path().join("translation_history.json"), "[1, 2").unwrap();

    let store: Arc<dyn BlobStore> = Arc::new(FileStore::new(dir.path()));
    assert!(ResponseCache::load(store.clone()).is_empty());
    assert!(HistoryLog::load(store).is_empty());
}
