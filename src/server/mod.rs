//! Server module for building the storefront HTTP server
//!
//! `ServerBuilder` turns an [`AppConfig`](crate::config::AppConfig) and a
//! storage backend into an axum `Router` with:
//! - JWT authentication on every request
//! - per route group authorization policies
//! - request tracing and CORS

pub mod builder;
pub mod middleware;
pub mod router;
pub mod state;

pub use builder::ServerBuilder;
pub use middleware::{JwtAuthProvider, authenticate, restrict_to};
pub use router::{build_router, cors_layer};
pub use state::AppState;
