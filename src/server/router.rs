//! Router assembly: API routes plus authentication and transport layers

use crate::core::auth::AuthProvider;
use crate::handlers;
use crate::server::middleware::authenticate;
use crate::server::state::AppState;
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// CORS policy for the configured origins; an empty list allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
    }
}

/// Build the complete application router
///
/// `extra` routes are merged before authentication is layered on, so they
/// see the same [`AuthContext`](crate::core::auth::AuthContext) as the API.
pub fn build_router(
    state: AppState,
    provider: Arc<dyn AuthProvider>,
    cors: CorsLayer,
    extra: Vec<Router<AppState>>,
) -> Router {
    let mut routes = handlers::api_routes();
    for router in extra {
        routes = routes.merge(router);
    }

    routes
        .layer(middleware::from_fn_with_state(provider, authenticate))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
