//! HTTP route handlers.

mod comment;
mod health;
mod news;

use axum::Router;

use crate::state::AppState;

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(news::router())
        .merge(comment::router())
        .with_state(state)
}
