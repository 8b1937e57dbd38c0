//! MongoDB storage backend using the official MongoDB async driver.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb_backend` feature flag.
//!
//! # Storage model
//!
//! One collection per record type, named after `T::resource_name()`
//! ("products", "orders", ...). Records are serialized via
//! `serde_json::Value` and then converted to BSON, so UUIDs and timestamps
//! are stored as strings and the `id` field maps to `_id`.
//!
//! # Transactions
//!
//! Every [`CommerceService`] operation runs inside a multi-document
//! transaction, which requires a replica set (a single-node replica set is
//! enough). Stock is decremented with a conditional `$inc` so that a
//! concurrent order can never drive it below zero.

use crate::core::entity::Record;
use crate::core::error::{ShopError, ShopResult};
use crate::core::service::{CommerceService, DataService};
use crate::entities::{
    Category, Order, OrderDraft, PricingPolicy, Product, ProductPatch, Review, StatusChange,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, TRANSIENT_TRANSACTION_ERROR, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a serde_json::Value (expected to be an Object) into a BSON Document,
/// renaming `id` → `_id` for MongoDB convention.
fn json_to_document(json: serde_json::Value) -> Result<Document> {
    let bson_val = mongodb::bson::to_bson(&json)
        .map_err(|e| anyhow!("Failed to convert JSON to BSON: {}", e))?;

    let mut doc = match bson_val {
        Bson::Document(d) => d,
        _ => return Err(anyhow!("Expected BSON document, got non-object")),
    };

    if let Some(id) = doc.remove("id") {
        doc.insert("_id", id);
    }

    Ok(doc)
}

/// Convert a BSON Document back into a serde_json::Value,
/// renaming `_id` → `id`.
fn document_to_json(mut doc: Document) -> serde_json::Value {
    if let Some(id) = doc.remove("_id") {
        doc.insert("id", id);
    }

    Bson::Document(doc).into_relaxed_extjson()
}

fn record_to_document<T: Record>(record: &T) -> Result<Document> {
    let json =
        serde_json::to_value(record).map_err(|e| anyhow!("Failed to serialize record: {}", e))?;
    json_to_document(json)
}

fn document_to_record<T: Record>(doc: Document) -> Result<T> {
    serde_json::from_value(document_to_json(doc))
        .map_err(|e| anyhow!("Failed to deserialize record from document: {}", e))
}

fn uuid_bson(id: &Uuid) -> Bson {
    Bson::String(id.to_string())
}

/// Timestamps are stored in their serde string form
fn timestamp_bson(at: DateTime<Utc>) -> ShopResult<Bson> {
    match serde_json::to_value(at) {
        Ok(serde_json::Value::String(s)) => Ok(Bson::String(s)),
        _ => Err(ShopError::Internal("Failed to encode timestamp".to_string())),
    }
}

/// Case-insensitive exact match on a category name
fn category_filter(name: &str) -> Document {
    doc! {
        "category": {
            "$regex": format!("^{}$", regex::escape(name.trim())),
            "$options": "i",
        }
    }
}

/// `$set` body holding only the fields a patch sets
fn product_patch_set(patch: ProductPatch, now: DateTime<Utc>) -> ShopResult<Document> {
    let mut set = doc! { "updatedAt": timestamp_bson(now)? };
    if let Some(name) = patch.name {
        set.insert("name", name);
    }
    if let Some(description) = patch.description {
        set.insert("description", description);
    }
    if let Some(price) = patch.price {
        set.insert("price", price);
    }
    if let Some(category) = patch.category {
        set.insert("category", category);
    }
    if let Some(stock) = patch.stock {
        set.insert("stock", stock);
    }
    if let Some(brand) = patch.brand {
        set.insert("brand", brand);
    }
    if let Some(images) = patch.images {
        set.insert("images", images);
    }
    if let Some(sku) = patch.sku {
        set.insert("sku", sku);
    }
    if let Some(active) = patch.is_active {
        set.insert("isActive", active);
    }
    Ok(set)
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == 11000,
        ErrorKind::Command(e) => e.code == 11000,
        _ => false,
    }
}

/// Map a driver error onto the storefront taxonomy
fn mongo_error(context: &str, err: mongodb::error::Error) -> ShopError {
    if is_duplicate_key(&err) {
        ShopError::Conflict("A record with the same unique key already exists".to_string())
    } else if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        ShopError::Conflict("Concurrent update, please retry".to_string())
    } else {
        ShopError::Storage(format!("{}: {}", context, err))
    }
}

// ---------------------------------------------------------------------------
// MongoStore
// ---------------------------------------------------------------------------

/// Storage backend backed by one MongoDB database.
///
/// # Example
///
/// ```rust,ignore
/// let store = MongoStore::connect("mongodb://localhost:27017/?replicaSet=rs0", "storefront").await?;
/// store.ensure_indexes().await?;
/// let repositories = Repositories::from_backend(store);
/// ```
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub fn new(client: Client, database: Database) -> Self {
        Self { client, database }
    }

    /// Connect and select a database
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| anyhow!("Failed to connect to MongoDB: {}", e))?;
        let database = client.database(database);
        Ok(Self::new(client, database))
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection<T: Record>(&self) -> Collection<Document> {
        self.database.collection(T::resource_name())
    }

    /// Create unique and lookup indexes.
    ///
    /// - `categories.slug`, `users.email`, `admins.email`: unique
    /// - `products.category`, `orders.userId`, `orders.createdAt`: lookups
    ///
    /// This method is idempotent, safe to call on every startup.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        let plan: Vec<(&str, Vec<IndexModel>)> = vec![
            (
                Category::resource_name(),
                vec![
                    IndexModel::builder()
                        .keys(doc! { "slug": 1 })
                        .options(unique())
                        .build(),
                ],
            ),
            (
                "users",
                vec![
                    IndexModel::builder()
                        .keys(doc! { "email": 1 })
                        .options(unique())
                        .build(),
                ],
            ),
            (
                "admins",
                vec![
                    IndexModel::builder()
                        .keys(doc! { "email": 1 })
                        .options(unique())
                        .build(),
                ],
            ),
            (
                Product::resource_name(),
                vec![IndexModel::builder().keys(doc! { "category": 1 }).build()],
            ),
            (
                Order::resource_name(),
                vec![
                    IndexModel::builder().keys(doc! { "userId": 1 }).build(),
                    IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
                ],
            ),
        ];

        for (collection, indexes) in plan {
            self.database
                .collection::<Document>(collection)
                .create_indexes(indexes)
                .await
                .map_err(|e| anyhow!("Failed to create indexes on {}: {}", collection, e))?;
        }

        Ok(())
    }

    async fn begin(&self) -> ShopResult<ClientSession> {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| mongo_error("Failed to start session", e))?;
        session
            .start_transaction()
            .await
            .map_err(|e| mongo_error("Failed to start transaction", e))?;
        Ok(session)
    }

    /// Commit on success, abort on failure
    async fn finish<T: Send>(&self, mut session: ClientSession, result: ShopResult<T>) -> ShopResult<T> {
        match result {
            Ok(value) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|e| mongo_error("Failed to commit transaction", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!(error = %abort, "failed to abort transaction");
                }
                Err(err)
            }
        }
    }

    async fn find_in<T: Record>(&self, session: &mut ClientSession, id: &Uuid) -> ShopResult<Option<T>> {
        let doc = self
            .collection::<T>()
            .find_one(doc! { "_id": uuid_bson(id) })
            .session(&mut *session)
            .await
            .map_err(|e| mongo_error("Failed to read record", e))?;
        match doc {
            Some(d) => Ok(Some(document_to_record(d)?)),
            None => Ok(None),
        }
    }

    async fn replace_in<T: Record>(&self, session: &mut ClientSession, record: &T) -> ShopResult<()> {
        let doc = record_to_document(record)?;
        self.collection::<T>()
            .replace_one(doc! { "_id": uuid_bson(&record.id()) }, doc)
            .session(&mut *session)
            .await
            .map_err(|e| mongo_error("Failed to write record", e))?;
        Ok(())
    }

    async fn adjust_stock(
        &self,
        session: &mut ClientSession,
        product_id: &Uuid,
        delta: i64,
        now: DateTime<Utc>,
    ) -> ShopResult<bool> {
        let mut filter = doc! { "_id": uuid_bson(product_id) };
        if delta < 0 {
            filter.insert("isActive", true);
            filter.insert("stock", doc! { "$gte": -delta });
        }
        let result = self
            .collection::<Product>()
            .update_one(
                filter,
                doc! {
                    "$inc": { "stock": delta },
                    "$set": { "updatedAt": timestamp_bson(now)? },
                },
            )
            .session(&mut *session)
            .await
            .map_err(|e| mongo_error("Failed to update stock", e))?;
        Ok(result.matched_count == 1)
    }

    async fn place_order_in(
        &self,
        session: &mut ClientSession,
        draft: OrderDraft,
        pricing: PricingPolicy,
    ) -> ShopResult<Order> {
        let requested = draft.requested_quantities()?;
        let mut products = HashMap::with_capacity(requested.len());
        for id in requested.keys() {
            if let Some(product) = self.find_in::<Product>(session, id).await? {
                products.insert(*id, product);
            }
        }

        let now = Utc::now();
        let order = draft.build(&products, pricing, now)?;

        for (id, quantity) in &requested {
            if !self.adjust_stock(session, id, -quantity, now).await? {
                // Lost a race after the availability check
                let available = products.get(id).map_or(0, |p| p.stock);
                let name = products.get(id).map_or("product", |p| p.name.as_str());
                return Err(ShopError::insufficient_stock(*id, name, *quantity, available));
            }
        }

        self.collection::<Order>()
            .insert_one(record_to_document(&order)?)
            .session(&mut *session)
            .await
            .map_err(|e| mongo_error("Failed to insert order", e))?;

        Ok(order)
    }

    async fn change_order_status_in(
        &self,
        session: &mut ClientSession,
        order_id: &Uuid,
        change: StatusChange,
    ) -> ShopResult<(Order, usize)> {
        let mut order = self
            .find_in::<Order>(session, order_id)
            .await?
            .ok_or_else(|| ShopError::not_found("order", order_id))?;
        let now = Utc::now();
        let effect = order.apply_status_change(&change, now)?;

        let mut restocked = 0;
        if effect.restock {
            for (product_id, quantity) in order.quantities() {
                if self.adjust_stock(session, &product_id, quantity, now).await? {
                    restocked += 1;
                } else {
                    tracing::warn!(%product_id, order_id = %order.id, "cannot restock deleted product");
                }
            }
        }

        self.replace_in(session, &order).await?;
        Ok((order, restocked))
    }

    async fn update_category_in(
        &self,
        session: &mut ClientSession,
        category_id: &Uuid,
        category: Category,
    ) -> ShopResult<(Category, u64)> {
        let existing = self
            .find_in::<Category>(session, category_id)
            .await?
            .ok_or_else(|| ShopError::not_found("category", category_id))?;

        let mut moved = 0;
        if existing.name != category.name {
            let result = self
                .collection::<Product>()
                .update_many(
                    category_filter(&existing.name),
                    doc! {
                        "$set": {
                            "category": category.name.as_str(),
                            "updatedAt": timestamp_bson(category.updated_at)?,
                        }
                    },
                )
                .session(&mut *session)
                .await
                .map_err(|e| mongo_error("Failed to move products", e))?;
            moved = result.modified_count;
        }

        self.replace_in(session, &category).await?;
        Ok((category, moved))
    }

    async fn delete_category_in(&self, session: &mut ClientSession, category_id: &Uuid) -> ShopResult<()> {
        let existing = self
            .find_in::<Category>(session, category_id)
            .await?
            .ok_or_else(|| ShopError::not_found("category", category_id))?;

        let referencing = self
            .collection::<Product>()
            .count_documents(category_filter(&existing.name))
            .session(&mut *session)
            .await
            .map_err(|e| mongo_error("Failed to count products", e))?;
        if referencing > 0 {
            return Err(ShopError::category_in_use(&existing.name, referencing));
        }

        self.collection::<Category>()
            .delete_one(doc! { "_id": uuid_bson(category_id) })
            .session(&mut *session)
            .await
            .map_err(|e| mongo_error("Failed to delete category", e))?;
        Ok(())
    }

    async fn add_review_in(
        &self,
        session: &mut ClientSession,
        product_id: &Uuid,
        review: Review,
    ) -> ShopResult<Product> {
        let mut product = self
            .find_in::<Product>(session, product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ShopError::not_found("product", product_id))?;
        product.add_review(review)?;
        self.replace_in(session, &product).await?;
        Ok(product)
    }

    async fn update_product_in(
        &self,
        session: &mut ClientSession,
        product_id: &Uuid,
        patch: ProductPatch,
    ) -> ShopResult<Product> {
        let result = self
            .collection::<Product>()
            .update_one(
                doc! { "_id": uuid_bson(product_id) },
                doc! { "$set": product_patch_set(patch, Utc::now())? },
            )
            .session(&mut *session)
            .await
            .map_err(|e| mongo_error("Failed to update product", e))?;
        if result.matched_count == 0 {
            return Err(ShopError::not_found("product", product_id));
        }

        self.find_in::<Product>(session, product_id)
            .await?
            .ok_or_else(|| ShopError::not_found("product", product_id))
    }
}

#[async_trait]
impl<T: Record> DataService<T> for MongoStore {
    async fn create(&self, record: T) -> Result<T> {
        let doc = record_to_document(&record)?;
        self.collection::<T>()
            .insert_one(doc)
            .await
            .map_err(|e| mongo_error("Failed to create record", e))?;
        Ok(record)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let doc = self
            .collection::<T>()
            .find_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| mongo_error("Failed to get record", e))?;

        doc.map(document_to_record).transpose()
    }

    /// List all records, ordered by creation time (newest first).
    async fn list(&self) -> Result<Vec<T>> {
        let cursor = self
            .collection::<T>()
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await
            .map_err(|e| mongo_error("Failed to list records", e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| mongo_error("Failed to collect records", e))?;

        let mut records = docs
            .into_iter()
            .map(document_to_record)
            .collect::<Result<Vec<T>>>()?;
        records.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
        Ok(records)
    }

    /// Returns `Err` if the record does not exist (no document matched).
    async fn update(&self, id: &Uuid, record: T) -> Result<T> {
        let doc = record_to_document(&record)?;

        let result = self
            .collection::<T>()
            .replace_one(doc! { "_id": uuid_bson(id) }, doc)
            .await
            .map_err(|e| mongo_error("Failed to update record", e))?;

        if result.matched_count == 0 {
            return Err(ShopError::not_found(T::resource_name_singular(), id).into());
        }

        Ok(record)
    }

    /// Silently succeeds if the record does not exist (idempotent).
    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.collection::<T>()
            .delete_one(doc! { "_id": uuid_bson(id) })
            .await
            .map_err(|e| mongo_error("Failed to delete record", e))?;

        Ok(())
    }

    /// Search records by field value.
    ///
    /// MongoDB stores values with native BSON types, so the string value is
    /// matched against its string, integer, float and boolean readings.
    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let mut variants: Vec<Bson> = vec![Bson::String(value.to_string())];

        match value {
            "true" => variants.push(Bson::Boolean(true)),
            "false" => variants.push(Bson::Boolean(false)),
            _ => {
                if let Ok(i) = value.parse::<i64>() {
                    variants.push(Bson::Int64(i));
                    variants.push(Bson::Double(i as f64));
                } else if let Ok(f) = value.parse::<f64>() {
                    variants.push(Bson::Double(f));
                }
            }
        }

        let cursor = self
            .collection::<T>()
            .find(doc! { field: { "$in": variants } })
            .sort(doc! { "createdAt": -1 })
            .await
            .map_err(|e| mongo_error("Failed to search records", e))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| mongo_error("Failed to collect search results", e))?;

        docs.into_iter().map(document_to_record).collect()
    }
}

#[async_trait]
impl CommerceService for MongoStore {
    async fn place_order(&self, draft: OrderDraft, pricing: PricingPolicy) -> ShopResult<Order> {
        let mut session = self.begin().await?;
        let result = self.place_order_in(&mut session, draft, pricing).await;
        let order = self.finish(session, result).await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total = order.total_price,
            "order placed"
        );
        Ok(order)
    }

    async fn change_order_status(
        &self,
        order_id: &Uuid,
        change: StatusChange,
    ) -> ShopResult<Order> {
        let mut session = self.begin().await?;
        let result = self
            .change_order_status_in(&mut session, order_id, change)
            .await;
        let (order, restocked) = self.finish(session, result).await?;

        if restocked > 0 {
            tracing::info!(order_id = %order.id, products = restocked, "order cancelled, stock restored");
        }
        Ok(order)
    }

    async fn update_category(
        &self,
        category_id: &Uuid,
        category: Category,
    ) -> ShopResult<Category> {
        let mut session = self.begin().await?;
        let result = self
            .update_category_in(&mut session, category_id, category)
            .await;
        let (category, moved) = self.finish(session, result).await?;

        if moved > 0 {
            tracing::info!(category = %category.name, products = moved, "category renamed, products moved");
        }
        Ok(category)
    }

    async fn delete_category(&self, category_id: &Uuid) -> ShopResult<()> {
        let mut session = self.begin().await?;
        let result = self.delete_category_in(&mut session, category_id).await;
        self.finish(session, result).await
    }

    async fn add_review(&self, product_id: &Uuid, review: Review) -> ShopResult<Product> {
        let mut session = self.begin().await?;
        let result = self.add_review_in(&mut session, product_id, review).await;
        self.finish(session, result).await
    }

    async fn update_product(&self, product_id: &Uuid, patch: ProductPatch) -> ShopResult<Product> {
        let mut session = self.begin().await?;
        let result = self.update_product_in(&mut session, product_id, patch).await;
        self.finish(session, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_to_document_renames_id_to_underscore_id() {
        let input = json!({"id": "abc", "name": "test"});
        let doc = json_to_document(input).unwrap();

        assert!(doc.contains_key("_id"), "document should contain _id");
        assert!(!doc.contains_key("id"), "document should not contain id");
        assert_eq!(doc.get_str("_id").unwrap(), "abc");
    }

    #[test]
    fn json_to_document_non_object_returns_error() {
        let err = json_to_document(json!("string")).unwrap_err().to_string();
        assert!(err.contains("non-object"), "got: {err}");
    }

    #[test]
    fn product_roundtrips_through_bson() {
        let product = Product::new(
            "Lamp".into(),
            "Warm".into(),
            19.99,
            "Lighting".into(),
            7,
            None,
        );
        let doc = record_to_document(&product).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), product.id.to_string());
        assert_eq!(doc.get_i64("stock").unwrap(), 7);

        let back: Product = document_to_record(doc).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn product_patch_sets_only_given_fields() {
        let patch = ProductPatch {
            price: Some(12.5),
            is_active: Some(false),
            ..ProductPatch::default()
        };
        let set = product_patch_set(patch, Utc::now()).unwrap();

        assert_eq!(set.get_f64("price").unwrap(), 12.5);
        assert!(!set.get_bool("isActive").unwrap());
        assert!(set.contains_key("updatedAt"));
        assert!(!set.contains_key("stock"));
        assert!(!set.contains_key("reviews"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn category_filter_escapes_name() {
        let filter = category_filter(" Toys (Kids) ");
        let inner = filter.get_document("category").unwrap();
        assert_eq!(inner.get_str("$regex").unwrap(), r"^Toys \(Kids\)$");
        assert_eq!(inner.get_str("$options").unwrap(), "i");
    }
}
