//! Shared application state.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::cache::{QueryCache, RedisStore};
use crate::config::Config;
use crate::db;
use crate::services::{CommentService, NewsService};

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: PgPool,
    news: NewsService,
    comments: CommentService,
}

impl AppState {
    /// Wire up the pool, the cache, and the services from configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config).await?;
        let client = redis::Client::open(config.redis_url.as_str())
            .context("invalid Redis connection URL")?;
        let cache = QueryCache::new(Arc::new(RedisStore::new(client)));

        Ok(Self::from_parts(pool, cache, config.list_cache_ttl_secs))
    }

    /// Assemble state from already-built parts. Lets integration tests swap
    /// in their own cache store.
    pub fn from_parts(db: PgPool, cache: QueryCache, list_cache_ttl_secs: u64) -> Self {
        let news = NewsService::new(db.clone(), cache.clone(), list_cache_ttl_secs);
        let comments = CommentService::new(db.clone(), cache);

        Self {
            inner: Arc::new(AppStateInner { db, news, comments }),
        }
    }

    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn news(&self) -> &NewsService {
        &self.inner.news
    }

    pub fn comments(&self) -> &CommentService {
        &self.inner.comments
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
