//! Core module containing fundamental traits and types for the storefront

pub mod auth;
pub mod credentials;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod query;
pub mod service;

pub use auth::{AuthContext, AuthPolicy, AuthProvider, NoAuthProvider, Principal, Role};
pub use credentials::TokenService;
pub use entity::Record;
pub use error::{ShopError, ShopResult};
pub use service::{CommerceService, DataService};
