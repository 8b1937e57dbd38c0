//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "mongodb_backend")]
pub mod mongodb;

pub use in_memory::InMemoryStore;
#[cfg(feature = "mongodb_backend")]
pub use self::mongodb::MongoStore;

use crate::core::service::{CommerceService, DataService};
use crate::entities::{Admin, Category, Order, Product, User};
use std::sync::Arc;

/// Every storage handle the application needs, erased behind trait objects
///
/// Handlers depend on this struct only, so the backend is chosen once at
/// startup.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn DataService<Product>>,
    pub categories: Arc<dyn DataService<Category>>,
    pub orders: Arc<dyn DataService<Order>>,
    pub users: Arc<dyn DataService<User>>,
    pub admins: Arc<dyn DataService<Admin>>,
    pub commerce: Arc<dyn CommerceService>,
}

impl Repositories {
    /// Wire every handle to the same backend
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: DataService<Product>
            + DataService<Category>
            + DataService<Order>
            + DataService<User>
            + DataService<Admin>
            + CommerceService
            + Clone
            + 'static,
    {
        Self {
            products: Arc::new(backend.clone()),
            categories: Arc::new(backend.clone()),
            orders: Arc::new(backend.clone()),
            users: Arc::new(backend.clone()),
            admins: Arc::new(backend.clone()),
            commerce: Arc::new(backend),
        }
    }

    /// Fresh, empty in-memory storage
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryStore::new())
    }
}
