#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Read-through cache behavior against in-memory stores.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use pressroom_kernel::cache::{CacheStore, QueryCache, cache_key};

/// In-memory store. TTLs are accepted and ignored.
#[derive(Default)]
struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        match pattern.strip_suffix('*') {
            Some(prefix) => entries.retain(|k, _| !k.starts_with(prefix)),
            None => {
                entries.remove(pattern);
            }
        }
        Ok((before - entries.len()) as u64)
    }
}

/// Store where every operation fails, simulating a Redis outage.
struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(anyhow!("connection refused"))
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<()> {
        Err(anyhow!("connection refused"))
    }

    async fn delete_matching(&self, _pattern: &str) -> Result<u64> {
        Err(anyhow!("connection refused"))
    }
}

#[tokio::test]
async fn miss_computes_and_populates() {
    let store = Arc::new(MemoryStore::default());
    let cache = QueryCache::new(store.clone());
    let computed = Arc::new(AtomicUsize::new(0));

    let counter = computed.clone();
    let value: Value = cache
        .get_or_compute("news:public:{}", 60, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"data": [1, 2, 3]}))
        })
        .await
        .unwrap();

    assert_eq!(value, json!({"data": [1, 2, 3]}));
    assert_eq!(computed.load(Ordering::SeqCst), 1);
    assert!(store.contains("news:public:{}"));
}

#[tokio::test]
async fn hit_short_circuits_compute() {
    let store = Arc::new(MemoryStore::default());
    store.insert("news:public:{}", r#"{"data":[42]}"#);
    let cache = QueryCache::new(store);
    let computed = Arc::new(AtomicUsize::new(0));

    let counter = computed.clone();
    let value: Value = cache
        .get_or_compute("news:public:{}", 60, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"data": []}))
        })
        .await
        .unwrap();

    assert_eq!(value, json!({"data": [42]}));
    assert_eq!(computed.load(Ordering::SeqCst), 0, "hit must not recompute");
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let store = Arc::new(MemoryStore::default());
    let cache = QueryCache::new(store);
    let computed = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let counter = computed.clone();
        let _: Value = cache
            .get_or_compute("news:admin:{}", 60, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"total": 7}))
            })
            .await
            .unwrap();
    }

    assert_eq!(computed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn prefix_invalidation_is_scoped() {
    let store = Arc::new(MemoryStore::default());
    store.insert("news:public:a", "{}");
    store.insert("news:admin:b", "{}");
    store.insert("comment:list:c", "{}");
    let cache = QueryCache::new(store.clone());

    cache.invalidate_prefix("news:*").await;

    assert!(!store.contains("news:public:a"));
    assert!(!store.contains("news:admin:b"));
    assert!(
        store.contains("comment:list:c"),
        "other namespaces must survive"
    );
}

#[tokio::test]
async fn store_outage_degrades_to_compute() {
    let cache = QueryCache::new(Arc::new(FailingStore));
    let computed = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let counter = computed.clone();
        let value: Value = cache
            .get_or_compute("news:public:{}", 60, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"ok": true}))
            })
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    // No caching possible, so every call computes.
    assert_eq!(computed.load(Ordering::SeqCst), 2);

    // Invalidation against a dead store must not panic or error out.
    cache.invalidate_prefix("news:*").await;
}

#[tokio::test]
async fn corrupt_payload_recomputes_and_repairs() {
    let store = Arc::new(MemoryStore::default());
    store.insert("news:public:{}", "not json at all");
    let cache = QueryCache::new(store.clone());

    let value: Value = cache
        .get_or_compute("news:public:{}", 60, || async move { Ok(json!([1])) })
        .await
        .unwrap();

    assert_eq!(value, json!([1]));
    assert_eq!(
        store.get("news:public:{}").await.unwrap().as_deref(),
        Some("[1]")
    );
}

#[tokio::test]
async fn compute_errors_are_not_cached() {
    let store = Arc::new(MemoryStore::default());
    let cache = QueryCache::new(store.clone());

    let result: Result<Value, _> = cache
        .get_or_compute("news:public:{}", 60, || async move {
            Err(pressroom_kernel::error::AppError::NotFound)
        })
        .await;

    assert!(result.is_err());
    assert!(!store.contains("news:public:{}"));
}

#[test]
fn cache_keys_separate_audiences_and_params() {
    let public = cache_key("news", &[json!("public"), json!({"page": "1"})]);
    let admin = cache_key("news", &[json!("admin"), json!({"page": "1"})]);
    let other_page = cache_key("news", &[json!("public"), json!({"page": "2"})]);

    assert_ne!(public, admin);
    assert_ne!(public, other_page);
    assert!(public.starts_with("news:"));
}
