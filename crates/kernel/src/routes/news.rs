//! News article endpoints.
//!
//! Public readers get the cached, projected listing and single-article reads;
//! the admin surface adds full CRUD plus the soft-delete lifecycle.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Article, CreateArticle, UpdateArticle};
use crate::query::{QueryParams, QueryResult};
use crate::services::Audience;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/news", get(list_public))
        .route("/api/news/{id}", get(get_article))
        .route("/api/admin/news", get(list_admin).post(create))
        .route("/api/admin/news/{id}", put(update).delete(soft_delete))
        .route("/api/admin/news/{id}/restore", post(restore))
        .route("/api/admin/news/{id}/permanent", delete(delete_permanently))
}

async fn list_public(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<QueryResult<Value>>> {
    let result = state
        .news()
        .list(Audience::Public, QueryParams::from(raw))
        .await?;
    Ok(Json(result))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Article>> {
    let article = state.news().get(id).await?;
    // Best-effort view tracking; a failed bump must not fail the read.
    if let Err(e) = state.news().record_view(id).await {
        tracing::warn!(article_id = %id, error = %e, "view count bump failed");
    }
    Ok(Json(article))
}

async fn list_admin(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> AppResult<Json<QueryResult<Value>>> {
    let result = state
        .news()
        .list(Audience::Admin, QueryParams::from(raw))
        .await?;
    Ok(Json(result))
}

async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateArticle>,
) -> AppResult<(StatusCode, Json<Article>)> {
    let article = state.news().create(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateArticle>,
) -> AppResult<Json<Article>> {
    let article = state.news().update(id, input).await?;
    Ok(Json(article))
}

async fn soft_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.news().soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.news().restore(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_permanently(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.news().delete_permanently(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
