//! News article listings and lifecycle.
//!
//! Listings flow through the query layer with whitelisted search, filter,
//! sort, and projection fields, and are cached read-through under
//! `news:<audience>:<params>` keys. Every write path invalidates the whole
//! `news:*` namespace.

use sea_query::{Alias, Cond, Expr};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::{QueryCache, cache_key};
use crate::error::{AppError, AppResult};
use crate::models::{Article, CreateArticle, UpdateArticle};
use crate::query::{Facet, LeanOptions, ListQuery, QueryParams, QueryResult, QueryScope};

/// Fields matched by the `search` param.
pub const SEARCHABLE_FIELDS: &[&str] = &["title", "summary", "body"];

/// Fields accepted as equality filters.
pub const FILTERABLE_FIELDS: &[&str] = &[
    "status",
    "category",
    "author_id",
    "is_featured",
    "is_breaking",
];

/// Fields accepted in the `sort` param.
pub const SORTABLE_FIELDS: &[&str] = &[
    "created_at",
    "updated_at",
    "published_at",
    "views",
    "title",
];

/// Projection offered to unauthenticated readers.
pub const PUBLIC_FIELDS: &[&str] = &[
    "id",
    "title",
    "slug",
    "summary",
    "category",
    "author_id",
    "is_featured",
    "is_breaking",
    "views",
    "published_at",
    "created_at",
];

const CACHE_PREFIX: &str = "news";

/// Who is asking. Scopes the base filter, the projection, and the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Public,
    Admin,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Audience::Public => "public",
            Audience::Admin => "admin",
        }
    }
}

/// Service for article listings and lifecycle operations.
pub struct NewsService {
    db: PgPool,
    cache: QueryCache,
    cache_ttl_secs: u64,
}

impl NewsService {
    pub fn new(db: PgPool, cache: QueryCache, cache_ttl_secs: u64) -> Self {
        Self {
            db,
            cache,
            cache_ttl_secs,
        }
    }

    fn col(name: &str) -> Expr {
        Expr::col((Alias::new(Article::TABLE), Alias::new(name)))
    }

    /// Article scope for an audience: soft-deleted rows are never visible,
    /// the public additionally only sees published articles.
    fn scope(audience: Audience) -> QueryScope {
        let mut base = Cond::all().add(Self::col("deleted_at").is_null());
        if audience == Audience::Public {
            base = base.add(Self::col("status").eq("published"));
        }

        QueryScope::new(Article::TABLE, Article::COLUMNS)
            .with_condition(base)
            .with_virtual(
                "comment_count",
                "(SELECT COUNT(*) FROM comment WHERE comment.article_id = article.id \
                 AND comment.status = 'approved')",
            )
    }

    /// Workflow tab counts for the admin listing.
    fn workflow_facets() -> Vec<Facet> {
        vec![
            Facet::new(
                "published",
                Cond::all().add(Self::col("status").eq("published")),
            ),
            Facet::new("draft", Cond::all().add(Self::col("status").eq("draft"))),
            Facet::new(
                "featured",
                Cond::all().add(Self::col("is_featured").eq(true)),
            ),
            Facet::new(
                "breaking",
                Cond::all().add(Self::col("is_breaking").eq(true)),
            ),
        ]
    }

    /// List articles for an audience, read-through cached.
    pub async fn list(
        &self,
        audience: Audience,
        params: QueryParams,
    ) -> AppResult<QueryResult<Value>> {
        let key = cache_key(CACHE_PREFIX, &[json!(audience.as_str()), params.to_json()]);

        self.cache
            .get_or_compute(&key, self.cache_ttl_secs, || async move {
                let query = ListQuery::new(Self::scope(audience), params)
                    .search(SEARCHABLE_FIELDS)
                    .filter(Some(FILTERABLE_FIELDS))
                    .sort(Some(SORTABLE_FIELDS))
                    .paginate();

                match audience {
                    Audience::Public => {
                        query
                            .fields(Some(PUBLIC_FIELDS))
                            .lean(LeanOptions {
                                virtuals: true,
                                nulls: true,
                            })
                            .execute(&self.db)
                            .await
                    }
                    Audience::Admin => {
                        query
                            .fields(None)
                            .execute_with_facets(&self.db, &Self::workflow_facets())
                            .await
                    }
                }
            })
            .await
    }

    /// Fetch a single live article.
    pub async fn get(&self, id: Uuid) -> AppResult<Article> {
        Article::find_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Create an article and invalidate cached listings.
    ///
    /// A duplicate slug surfaces as a conflict rather than a server error.
    pub async fn create(&self, input: CreateArticle) -> AppResult<Article> {
        let article = Article::create(&self.db, input)
            .await
            .map_err(Self::map_write_error)?;
        self.invalidate().await;
        Ok(article)
    }

    /// Update an article and invalidate cached listings.
    pub async fn update(&self, id: Uuid, input: UpdateArticle) -> AppResult<Article> {
        let article = Article::update(&self.db, id, input)
            .await?
            .ok_or(AppError::NotFound)?;
        self.invalidate().await;
        Ok(article)
    }

    /// Soft-delete an article and invalidate cached listings.
    pub async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        if !Article::soft_delete(&self.db, id).await? {
            return Err(AppError::NotFound);
        }
        self.invalidate().await;
        Ok(())
    }

    /// Restore a soft-deleted article and invalidate cached listings.
    pub async fn restore(&self, id: Uuid) -> AppResult<()> {
        if !Article::restore(&self.db, id).await? {
            return Err(AppError::NotFound);
        }
        self.invalidate().await;
        Ok(())
    }

    /// Permanently delete a soft-deleted article.
    pub async fn delete_permanently(&self, id: Uuid) -> AppResult<()> {
        if !Article::delete_permanently(&self.db, id).await? {
            return Err(AppError::NotFound);
        }
        self.invalidate().await;
        Ok(())
    }

    /// Bump the view counter.
    ///
    /// Deliberately skips cache invalidation: counters drift within the list
    /// TTL instead of flushing the namespace on every page view.
    pub async fn record_view(&self, id: Uuid) -> AppResult<()> {
        Article::increment_views(&self.db, id).await?;
        Ok(())
    }

    async fn invalidate(&self) {
        self.cache.invalidate_prefix(&format!("{CACHE_PREFIX}:*")).await;
    }

    /// The slug column carries a unique index; collisions are a caller
    /// problem, everything else is infrastructure.
    fn map_write_error(e: anyhow::Error) -> AppError {
        match e.downcast_ref::<sqlx::Error>() {
            Some(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                AppError::Conflict("slug already in use".to_string())
            }
            _ => AppError::Internal(e),
        }
    }
}
