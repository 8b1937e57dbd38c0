//! # Storefront
//!
//! JSON REST API for an online store: a public catalog, customer accounts and
//! checkout, and an administration surface for staff.
//!
//! ## Features
//!
//! - **Unified principals**: customers and admins authenticate with the same
//!   JWT scheme and are authorized per route group with an `AuthPolicy`
//! - **Transactional checkout**: order placement and status changes are
//!   single storage operations, so stock is never oversold or restored twice
//! - **Server-trusted pricing**: totals are computed from stored products
//! - **Pluggable storage**: in-memory (default) or MongoDB
//!   (`mongodb_backend` feature)
//! - **Dashboard statistics** computed from the live collections
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use storefront::prelude::*;
//!
//! let config = AppConfig::from_env()?;
//! ServerBuilder::new()
//!     .with_config(config)
//!     .with_repositories(Repositories::in_memory())
//!     .serve()
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod handlers;
pub mod server;
pub mod services;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthContext, AuthPolicy, AuthProvider, Principal, Role},
        credentials::TokenService,
        entity::Record,
        error::{ShopError, ShopResult},
        service::{CommerceService, DataService},
    };

    // === Documents ===
    pub use crate::entities::{
        Admin, AdminRole, Category, Order, OrderStatus, PaymentStatus, PricingPolicy, Product,
        Review, User,
    };

    // === Storage ===
    #[cfg(feature = "mongodb_backend")]
    pub use crate::storage::MongoStore;
    pub use crate::storage::{InMemoryStore, Repositories};

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
