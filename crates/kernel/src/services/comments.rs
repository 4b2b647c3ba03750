//! Reader comments and the moderation queue.

use sea_query::{Alias, Cond, Expr};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::QueryCache;
use crate::error::{AppError, AppResult};
use crate::models::{Comment, CreateComment};
use crate::query::{Facet, JoinKind, JoinSpec, LeanOptions, ListQuery, QueryParams, QueryResult, QueryScope};

/// Fields matched by the `search` param in the moderation queue.
pub const SEARCHABLE_FIELDS: &[&str] = &["body", "author_name"];

/// Fields accepted in the `sort` param.
pub const SORTABLE_FIELDS: &[&str] = &["created_at", "updated_at"];

/// Moderation statuses accepted by [`CommentService::set_status`].
pub const STATUSES: &[&str] = &["pending", "approved", "spam"];

/// Service for article comments.
pub struct CommentService {
    db: PgPool,
    cache: QueryCache,
}

impl CommentService {
    pub fn new(db: PgPool, cache: QueryCache) -> Self {
        Self { db, cache }
    }

    fn col(name: &str) -> Expr {
        Expr::col((Alias::new(Comment::TABLE), Alias::new(name)))
    }

    /// Approved comments under one article, as plain JSON rows.
    pub async fn list_for_article(
        &self,
        article_id: Uuid,
        params: QueryParams,
    ) -> AppResult<QueryResult<Value>> {
        let scope = QueryScope::new(Comment::TABLE, Comment::COLUMNS).with_condition(
            Cond::all()
                .add(Self::col("article_id").eq(article_id))
                .add(Self::col("status").eq("approved")),
        );

        ListQuery::new(scope, params)
            .sort(Some(SORTABLE_FIELDS))
            .paginate()
            .fields(None)
            .lean(LeanOptions {
                virtuals: false,
                nulls: true,
            })
            .execute(&self.db)
            .await
    }

    /// The site-wide moderation queue with per-status counts.
    ///
    /// Filters stay open here (no whitelist) so moderators can slice by any
    /// comment column; joined article headlines ride along for context.
    pub async fn moderation_queue(&self, params: QueryParams) -> AppResult<QueryResult<Value>> {
        let scope = QueryScope::new(Comment::TABLE, Comment::COLUMNS)
            .with_join(JoinSpec {
                target_table: "article".to_string(),
                alias: "article".to_string(),
                local_field: "article_id".to_string(),
                foreign_field: "id".to_string(),
                kind: JoinKind::Left,
            })
            .with_virtual("article_title", "\"article\".\"title\"");

        let facets = vec![
            Facet::new("pending", Cond::all().add(Self::col("status").eq("pending"))),
            Facet::new(
                "approved",
                Cond::all().add(Self::col("status").eq("approved")),
            ),
            Facet::new("spam", Cond::all().add(Self::col("status").eq("spam"))),
        ];

        ListQuery::new(scope, params)
            .search(SEARCHABLE_FIELDS)
            .filter(None)
            .sort(Some(SORTABLE_FIELDS))
            .paginate()
            .fields(None)
            .execute_with_facets(&self.db, &facets)
            .await
    }

    /// Submit a new comment; it lands in the moderation queue as pending.
    pub async fn create(&self, article_id: Uuid, input: CreateComment) -> AppResult<Comment> {
        Ok(Comment::create(&self.db, article_id, input).await?)
    }

    /// Move a comment to another moderation status.
    pub async fn set_status(&self, id: Uuid, status: &str) -> AppResult<Comment> {
        if !STATUSES.contains(&status) {
            return Err(AppError::BadRequest(format!(
                "invalid comment status: {status}"
            )));
        }
        let comment = Comment::set_status(&self.db, id, status)
            .await?
            .ok_or(AppError::NotFound)?;
        self.invalidate_article_listings().await;
        Ok(comment)
    }

    /// Delete a comment and its replies.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !Comment::delete(&self.db, id).await? {
            return Err(AppError::NotFound);
        }
        self.invalidate_article_listings().await;
        Ok(())
    }

    /// Cached article listings embed the approved-comment count, so any
    /// moderation change must flush them. New submissions land as pending
    /// and do not affect that count.
    async fn invalidate_article_listings(&self) {
        self.cache.invalidate_prefix("news:*").await;
    }
}
