//! HTTP handlers grouped by route prefix
//!
//! Each submodule exposes `routes()`, a router relative to its prefix with
//! its [`AuthPolicy`](crate::core::auth::AuthPolicy) groups already applied.

pub mod admin;
pub mod auth;
pub mod orders;
pub mod products;

use crate::core::error::ShopError;
use crate::server::state::AppState;
use axum::http::Uri;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

/// Every API route, before authentication and transport layers
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::routes())
        .nest("/products", products::routes())
        .nest("/orders", orders::routes())
        .nest("/admin", admin::routes())
        .fallback(not_found)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found(uri: Uri) -> ShopError {
    ShopError::not_found("route", uri.path())
}
