//! News article model with a soft-delete lifecycle.
//!
//! Articles carry a publication workflow (`draft` → `published` → `archived`)
//! and a database-maintained `search_vector` column that stays out of default
//! projections.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Article record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Headline.
    pub title: String,

    /// URL slug.
    pub slug: String,

    /// Optional teaser shown in listings.
    pub summary: Option<String>,

    /// Article body.
    pub body: String,

    /// Workflow status: "draft", "published", or "archived".
    pub status: String,

    /// Section/category machine name.
    pub category: String,

    /// Author user ID.
    pub author_id: Uuid,

    /// Shown in the featured slot on the front page.
    pub is_featured: bool,

    /// Shown in the breaking-news ticker.
    pub is_breaking: bool,

    /// View counter.
    pub views: i64,

    /// Unix timestamp when published (NULL for unpublished drafts).
    pub published_at: Option<i64>,

    /// Unix timestamp when created.
    pub created_at: i64,

    /// Unix timestamp when last changed.
    pub updated_at: i64,

    /// Unix timestamp when soft-deleted (NULL for live rows).
    pub deleted_at: Option<i64>,
}

/// Input for creating an article.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticle {
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub body: String,
    pub status: Option<String>,
    pub category: String,
    pub author_id: Uuid,
    pub is_featured: Option<bool>,
    pub is_breaking: Option<bool>,
}

/// Input for updating an article. Absent fields are left untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub is_featured: Option<bool>,
    pub is_breaking: Option<bool>,
}

/// Columns selected back after writes.
const RETURNING: &str = "id, title, slug, summary, body, status, category, author_id, \
     is_featured, is_breaking, views, published_at, created_at, updated_at, deleted_at";

impl Article {
    /// Table name for query scopes.
    pub const TABLE: &'static str = "article";

    /// Every selectable column, including ones hidden from default
    /// projections.
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "slug",
        "summary",
        "body",
        "status",
        "category",
        "author_id",
        "is_featured",
        "is_breaking",
        "views",
        "published_at",
        "created_at",
        "updated_at",
        "deleted_at",
        "search_vector",
    ];

    /// Create a new article.
    pub async fn create(pool: &PgPool, input: CreateArticle) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();
        let status = input.status.unwrap_or_else(|| "draft".to_string());
        let published_at = (status == "published").then_some(now);

        let article = sqlx::query_as::<_, Article>(&format!(
            r#"
            INSERT INTO article (id, title, slug, summary, body, status, category, author_id,
                                 is_featured, is_breaking, views, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, $12, $12)
            RETURNING {RETURNING}
            "#
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(&status)
        .bind(&input.category)
        .bind(input.author_id)
        .bind(input.is_featured.unwrap_or(false))
        .bind(input.is_breaking.unwrap_or(false))
        .bind(published_at)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create article")?;

        Ok(article)
    }

    /// Find a live (not soft-deleted) article by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "SELECT {RETURNING} FROM article WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch article by id")?;

        Ok(article)
    }

    /// Apply a partial update.
    pub async fn update(pool: &PgPool, id: Uuid, input: UpdateArticle) -> Result<Option<Self>> {
        let now = chrono::Utc::now().timestamp();

        let article = sqlx::query_as::<_, Article>(&format!(
            r#"
            UPDATE article SET
                title = COALESCE($2, title),
                summary = COALESCE($3, summary),
                body = COALESCE($4, body),
                status = COALESCE($5, status),
                category = COALESCE($6, category),
                is_featured = COALESCE($7, is_featured),
                is_breaking = COALESCE($8, is_breaking),
                published_at = CASE
                    WHEN $5 = 'published' AND published_at IS NULL THEN $9
                    ELSE published_at
                END,
                updated_at = $9
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {RETURNING}
            "#
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(&input.status)
        .bind(&input.category)
        .bind(input.is_featured)
        .bind(input.is_breaking)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("failed to update article")?;

        Ok(article)
    }

    /// Soft-delete: the row stays put, hidden behind `deleted_at`.
    pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE article SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(pool)
        .await
        .context("failed to soft-delete article")?;

        Ok(result.rows_affected() > 0)
    }

    /// Bring a soft-deleted article back.
    pub async fn restore(pool: &PgPool, id: Uuid) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE article SET deleted_at = NULL, updated_at = $2 WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .bind(now)
        .execute(pool)
        .await
        .context("failed to restore article")?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove the row for good. Only soft-deleted rows are eligible.
    pub async fn delete_permanently(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM article WHERE id = $1 AND deleted_at IS NOT NULL")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to permanently delete article")?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump the view counter.
    pub async fn increment_views(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE article SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to increment article views")?;

        Ok(())
    }
}
