//! Read-through result cache with pattern invalidation.
//!
//! The store is an injected trait object so production uses Redis while tests
//! run against in-memory fakes. The cache is strictly best-effort: any store
//! failure is logged and treated as a miss, never surfaced to the caller.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppResult;

/// Minimal key-value contract the cache needs from a store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Delete every key matching a glob pattern; returns how many went away.
    async fn delete_matching(&self, pattern: &str) -> Result<u64>;
}

/// Redis-backed store.
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("failed to get Redis connection")?;
        let value: Option<String> = conn.get(key).await.context("GET failed")?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("failed to get Redis connection")?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .context("SETEX failed")?;
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("failed to get Redis connection")?;

        let mut cursor = 0u64;
        let mut deleted = 0u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .context("SCAN failed")?;

            if !keys.is_empty() {
                conn.del::<_, ()>(&keys).await.context("DEL failed")?;
                deleted += keys.len() as u64;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(deleted)
    }
}

/// Read-through cache over an injected store.
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<dyn CacheStore>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Return the cached value under `key`, or run `compute`, store its
    /// result with the given TTL, and return it.
    ///
    /// A hit short-circuits: `compute` is not invoked. Store read/write
    /// errors and undecodable payloads are logged at warn level and treated
    /// as misses; a store outage degrades to always-compute.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "undecodable cache payload, recomputing");
                }
            },
            Ok(None) => {
                debug!(key = %key, "cache miss");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
            }
        }

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(serialized) => {
                if let Err(e) = self.store.set_ex(key, &serialized, ttl_secs).await {
                    warn!(key = %key, error = %e, "cache write failed");
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to serialize value for cache");
            }
        }

        Ok(value)
    }

    /// Delete every cached entry whose key matches a glob pattern.
    ///
    /// Called by domain write paths; coarse by design, and best-effort like
    /// every other store interaction.
    pub async fn invalidate_prefix(&self, pattern: &str) {
        match self.store.delete_matching(pattern).await {
            Ok(deleted) => {
                debug!(pattern = %pattern, deleted = %deleted, "cache invalidated");
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "cache invalidation failed");
            }
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache").finish()
    }
}

/// Derive a cache key from a namespace prefix and a list of discriminators.
///
/// String parts are joined as-is; structured parts go through key-order
/// independent stringification, so two logically identical parameter objects
/// always derive the same key.
pub fn cache_key(prefix: &str, parts: &[Value]) -> String {
    let mut key = String::from(prefix);
    for part in parts {
        key.push(':');
        match part {
            Value::String(s) => key.push_str(s),
            other => key.push_str(&stable_stringify(other)),
        }
    }
    key
}

/// JSON stringification with object keys sorted recursively.
fn stable_stringify(value: &Value) -> String {
    fn normalize(value: &Value) -> Value {
        match value {
            Value::Object(obj) => {
                let mut keys: Vec<&String> = obj.keys().collect();
                keys.sort();
                let mut sorted = serde_json::Map::new();
                for k in keys {
                    sorted.insert(k.clone(), normalize(&obj[k]));
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
            other => other.clone(),
        }
    }

    normalize(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cache_key_joins_parts() {
        let key = cache_key("news", &[json!("public"), json!({"page": "1"})]);
        assert_eq!(key, r#"news:public:{"page":"1"}"#);
    }

    #[test]
    fn cache_key_ignores_object_key_order() {
        let a = cache_key("news", &[json!("self"), json!({"x": 1, "y": 2})]);
        let b = cache_key("news", &[json!("self"), json!({"y": 2, "x": 1})]);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_distinguishes_scopes() {
        let public = cache_key("news", &[json!("public"), json!({})]);
        let admin = cache_key("news", &[json!("admin"), json!({})]);
        assert_ne!(public, admin);
    }

    #[test]
    fn stable_stringify_sorts_nested_objects() {
        let a = json!({"b": {"d": 4, "c": 3}, "a": [{"z": 1, "y": 2}]});
        let b = json!({"a": [{"y": 2, "z": 1}], "b": {"c": 3, "d": 4}});
        assert_eq!(stable_stringify(&a), stable_stringify(&b));
    }

    #[test]
    fn stable_stringify_keeps_array_order() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(stable_stringify(&a), stable_stringify(&b));
    }
}
