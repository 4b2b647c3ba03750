//! Comment model for reader discussions on articles.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Comment record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Parent article ID.
    pub article_id: Uuid,

    /// Parent comment ID (NULL for top-level comments).
    pub parent_id: Option<Uuid>,

    /// Display name of the commenter (guest or registered).
    pub author_name: String,

    /// Comment body.
    pub body: String,

    /// Moderation status: "pending", "approved", or "spam".
    pub status: String,

    /// Unix timestamp when created.
    pub created_at: i64,

    /// Unix timestamp when last changed.
    pub updated_at: i64,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub parent_id: Option<Uuid>,
    pub author_name: String,
    pub body: String,
}

const RETURNING: &str = "id, article_id, parent_id, author_name, body, status, created_at, updated_at";

impl Comment {
    /// Table name for query scopes.
    pub const TABLE: &'static str = "comment";

    /// Every selectable column.
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "article_id",
        "parent_id",
        "author_name",
        "body",
        "status",
        "created_at",
        "updated_at",
    ];

    /// Create a new comment in the moderation queue.
    pub async fn create(pool: &PgPool, article_id: Uuid, input: CreateComment) -> Result<Self> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp();

        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"
            INSERT INTO comment (id, article_id, parent_id, author_name, body, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $6)
            RETURNING {RETURNING}
            "#
        ))
        .bind(id)
        .bind(article_id)
        .bind(input.parent_id)
        .bind(&input.author_name)
        .bind(&input.body)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create comment")?;

        Ok(comment)
    }

    /// Move a comment to a new moderation status.
    pub async fn set_status(pool: &PgPool, id: Uuid, status: &str) -> Result<Option<Self>> {
        let now = chrono::Utc::now().timestamp();
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comment SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {RETURNING}"
        ))
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("failed to update comment status")?;

        Ok(comment)
    }

    /// Delete a comment and its replies.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comment WHERE id = $1 OR parent_id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete comment")?;

        Ok(result.rows_affected() > 0)
    }
}
