//! Comment endpoints: public reading/posting plus admin moderation.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Comment, CreateComment};
use crate::query::{QueryParams, QueryResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/news/{id}/comments",
            get(list_for_article).post(create),
        )
        .route("/api/admin/comments", get(moderation_queue))
        .route("/api/admin/comments/{id}/status", put(set_status))
        .route("/api/admin/comments/{id}", delete(remove))
}

async fn list_for_article(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<QueryResult<Value>>> {
    // 404 for comments under a missing or soft-deleted article.
    state.news().get(article_id).await?;
    let result = state
        .comments()
        .list_for_article(article_id, QueryParams::from(raw))
        .await?;
    Ok(Json(result))
}

async fn create(
    State(state): State<AppState>,
    Path(article_id): Path<Uuid>,
    Json(input): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    state.news().get(article_id).await?;
    let comment = state.comments().create(article_id, input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn moderation_queue(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<QueryResult<Value>>> {
    let result = state
        .comments()
        .moderation_queue(QueryParams::from(raw))
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct SetStatus {
    status: String,
}

async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SetStatus>,
) -> AppResult<Json<Comment>> {
    let comment = state.comments().set_status(id, &input.status).await?;
    Ok(Json(comment))
}

async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.comments().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
