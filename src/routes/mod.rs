use std::sync::Arc;

use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::get,
};

use crate::{
    error::ErrorBody,
    middleware::guard::{AccessGuard, access_guard},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod categories;
pub mod content;
pub mod doc;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/orders", orders::router())
        .nest("/products", products::router())
        .nest("/users", users::router())
        .nest("/categories", categories::router())
        .nest("/content", content::router())
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}

/// Full application router with the access guard in front of every route,
/// the fallback included. Transport layers are added by the binary.
pub fn build_app(state: AppState, guard: AccessGuard) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(from_fn_with_state(Arc::new(guard), access_guard))
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: format!("No route for {}", uri.path()),
        }),
    )
}
