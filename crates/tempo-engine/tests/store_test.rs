use std::io::Write;
use tempfile::NamedTempFile;
use tempo_engine::request::CapturedRequest;
use tempo_engine::store::{JsonFileStore, MemoryStore, SessionStore};

#[tokio::test]
async fn test_memory_store_roundtrip() {
    let store = MemoryStore::new();
    assert!(store.get("k").await.is_none());

    store.insert("k", CapturedRequest::new("https://example.com", "GET"));
    assert_eq!(store.get("k").await.unwrap().url, "https://example.com");

    assert!(store.remove("k").is_some());
    assert!(store.get("k").await.is_none());
}

#[tokio::test]
async fn test_json_file_store_loads_captures() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            "foundations.add_time": {{
                "url": "https://example.com/progress",
                "method": "POST",
                "headers": {{"Content-Type": "text/xml"}},
                "body": "<a><delta_time>0</delta_time><updated_at>0</updated_at></a>",
                "timestamp": 1.5,
                "requestId": "10",
                "tabId": 3
            }}
        }}"#
    )
    .unwrap();

    let store = JsonFileStore::load(file.path()).await.unwrap();
    assert_eq!(store.len(), 1);
    let request = store.get("foundations.add_time").await.unwrap();
    assert_eq!(request.tab_id, 3);
    assert_eq!(request.header("content-type"), Some("text/xml"));
    assert!(store.get("missing").await.is_none());
}

#[tokio::test]
async fn test_json_file_store_rejects_garbage() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[1, 2, 3]").unwrap();
    assert!(JsonFileStore::load(file.path()).await.is_err());
}
