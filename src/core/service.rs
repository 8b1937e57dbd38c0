//! Service traits for document storage and commerce operations

use crate::core::entity::Record;
use crate::core::error::ShopResult;
use crate::entities::{
    Category, Order, OrderDraft, PricingPolicy, Product, ProductPatch, Review, StatusChange,
};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Service trait for managing one document type
///
/// Implementations provide CRUD operations for a specific record type.
/// The application is agnostic to the underlying storage mechanism.
#[async_trait]
pub trait DataService<T: Record>: Send + Sync {
    /// Create a new record
    async fn create(&self, record: T) -> Result<T>;

    /// Get a record by ID
    async fn get(&self, id: &Uuid) -> Result<Option<T>>;

    /// List all records, newest first
    async fn list(&self) -> Result<Vec<T>>;

    /// Replace an existing record
    ///
    /// Fails if no record with `id` exists.
    async fn update(&self, id: &Uuid, record: T) -> Result<T>;

    /// Delete a record (idempotent)
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Find records whose top-level `field` equals `value`
    ///
    /// `field` is the serialized (camelCase) field name. Numbers and booleans
    /// match their string rendering, so `("isActive", "true")` works.
    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>>;
}

/// Multi-document operations that must succeed or fail as a whole.
///
/// Each method is a single transactional boundary: on error nothing it
/// touched is modified.
#[async_trait]
pub trait CommerceService: Send + Sync {
    /// Price the draft from current product records, verify availability of
    /// every line, insert the order and decrement stock.
    async fn place_order(&self, draft: OrderDraft, pricing: PricingPolicy) -> ShopResult<Order>;

    /// Apply a status change to an order, restoring stock when it enters
    /// `cancelled`.
    async fn change_order_status(&self, order_id: &Uuid, change: StatusChange)
    -> ShopResult<Order>;

    /// Replace a category; when its name changes, every product referencing
    /// the old name is moved to the new one.
    async fn update_category(&self, category_id: &Uuid, category: Category)
    -> ShopResult<Category>;

    /// Delete a category that no product references.
    async fn delete_category(&self, category_id: &Uuid) -> ShopResult<()>;

    /// Append a review to a product and recompute its rating.
    async fn add_review(&self, product_id: &Uuid, review: Review) -> ShopResult<Product>;

    /// Write only the patched fields of a product.
    ///
    /// Stock decremented by concurrent orders and reviews added meanwhile
    /// survive unless the patch sets them.
    async fn update_product(&self, product_id: &Uuid, patch: ProductPatch)
    -> ShopResult<Product>;
}
