//! In-memory storage backend for testing and development
//!
//! Documents are held as `serde_json::Value` per collection, so one store
//! serves every [`Record`] type. All commerce operations run under a single
//! write lock with no `.await` inside it, which makes each of them atomic
//! with respect to every other storage call.

use crate::core::entity::Record;
use crate::core::error::{ShopError, ShopResult};
use crate::core::service::{CommerceService, DataService};
use crate::entities::{
    Category, Order, OrderDraft, PricingPolicy, Product, ProductPatch, Review, StatusChange,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use uuid::Uuid;

type Collection = BTreeMap<Uuid, Value>;
type Collections = HashMap<&'static str, Collection>;

/// Fields that must be unique within a collection
fn unique_fields(collection: &str) -> &'static [&'static str] {
    match collection {
        "categories" => &["slug"],
        "users" | "admins" => &["email"],
        _ => &[],
    }
}

fn encode<T: Record>(record: &T) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| anyhow!("Failed to serialize record: {}", e))
}

fn decode<T: Record>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| anyhow!("Failed to deserialize record: {}", e))
}

/// String form used by `search`: strings as-is, scalars rendered
fn field_matches(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        _ => false,
    }
}

/// Reject `doc` if another document in `collection` shares a unique field
fn check_unique(collection_name: &str, collection: &Collection, id: &Uuid, doc: &Value) -> ShopResult<()> {
    for field in unique_fields(collection_name) {
        let Some(value) = doc.get(*field) else {
            continue;
        };
        let taken = collection
            .iter()
            .any(|(other_id, other)| other_id != id && other.get(*field) == Some(value));
        if taken {
            return Err(ShopError::Conflict(format!(
                "A record with this {} already exists in {}",
                field, collection_name
            )));
        }
    }
    Ok(())
}

/// In-memory store implementing every storage trait
///
/// Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> ShopResult<RwLockWriteGuard<'_, Collections>> {
        self.collections
            .write()
            .map_err(|e| ShopError::Storage(format!("Failed to acquire write lock: {}", e)))
    }
}

/// Typed view over the locked collections for multi-document operations
struct Tx<'a> {
    collections: &'a mut Collections,
}

impl Tx<'_> {
    fn get<T: Record>(&self, id: &Uuid) -> ShopResult<Option<T>> {
        match self
            .collections
            .get(T::resource_name())
            .and_then(|c| c.get(id))
        {
            Some(value) => Ok(Some(decode(value)?)),
            None => Ok(None),
        }
    }

    fn all<T: Record>(&self) -> ShopResult<Vec<T>> {
        self.collections
            .get(T::resource_name())
            .map(|c| c.values().map(decode).collect::<Result<Vec<T>>>())
            .transpose()
            .map(|records| records.unwrap_or_default())
            .map_err(ShopError::from)
    }

    fn encode_all<T: Record>(records: &[T]) -> ShopResult<Vec<(Uuid, Value)>> {
        records
            .iter()
            .map(|r| Ok((r.id(), encode(r)?)))
            .collect::<Result<Vec<_>>>()
            .map_err(ShopError::from)
    }

    /// Write already-encoded documents; cannot fail
    fn put_encoded(&mut self, collection: &'static str, docs: Vec<(Uuid, Value)>) {
        let target = self.collections.entry(collection).or_default();
        for (id, doc) in docs {
            target.insert(id, doc);
        }
    }
}

#[async_trait]
impl<T: Record> DataService<T> for InMemoryStore {
    async fn create(&self, record: T) -> Result<T> {
        let doc = encode(&record)?;
        let mut collections = self.write()?;
        let collection = collections.entry(T::resource_name()).or_default();
        check_unique(T::resource_name(), collection, &record.id(), &doc)?;
        collection.insert(record.id(), doc);
        Ok(record)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        collections
            .get(T::resource_name())
            .and_then(|c| c.get(id))
            .map(decode)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<T>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut records = collections
            .get(T::resource_name())
            .map(|c| c.values().map(decode).collect::<Result<Vec<T>>>())
            .transpose()?
            .unwrap_or_default();
        records.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
        Ok(records)
    }

    async fn update(&self, id: &Uuid, record: T) -> Result<T> {
        let doc = encode(&record)?;
        let mut collections = self.write()?;
        let collection = collections.entry(T::resource_name()).or_default();

        if !collection.contains_key(id) {
            return Err(ShopError::not_found(T::resource_name_singular(), id).into());
        }
        check_unique(T::resource_name(), collection, id, &doc)?;
        collection.insert(*id, doc);
        Ok(record)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut collections = self.write()?;
        if let Some(collection) = collections.get_mut(T::resource_name()) {
            collection.remove(id);
        }
        Ok(())
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let Some(collection) = collections.get(T::resource_name()) else {
            return Ok(Vec::new());
        };
        let mut records = collection
            .values()
            .filter(|doc| field_matches(doc.get(field), value))
            .map(decode)
            .collect::<Result<Vec<T>>>()?;
        records.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
        Ok(records)
    }
}

#[async_trait]
impl CommerceService for InMemoryStore {
    async fn place_order(&self, draft: OrderDraft, pricing: PricingPolicy) -> ShopResult<Order> {
        let requested = draft.requested_quantities()?;

        let mut guard = self.write()?;
        let mut tx = Tx {
            collections: &mut guard,
        };

        let mut products = HashMap::with_capacity(requested.len());
        for id in requested.keys() {
            if let Some(product) = tx.get::<Product>(id)? {
                products.insert(*id, product);
            }
        }

        let now = Utc::now();
        let order = draft.build(&products, pricing, now)?;

        let mut decremented = Vec::with_capacity(requested.len());
        for (id, quantity) in &requested {
            if let Some(mut product) = products.remove(id) {
                product.stock -= quantity;
                product.updated_at = now;
                decremented.push(product);
            }
        }

        let product_docs = Tx::encode_all(&decremented)?;
        let order_doc = Tx::encode_all(std::slice::from_ref(&order))?;
        tx.put_encoded(Product::resource_name(), product_docs);
        tx.put_encoded(Order::resource_name(), order_doc);

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
        let mut guard = self.write()?;
        let mut tx = Tx {
            collections: &mut guard,
        };

        let mut order = tx
            .get::<Order>(order_id)?
            .ok_or_else(|| ShopError::not_found("order", order_id))?;
        let now = Utc::now();
        let effect = order.apply_status_change(&change, now)?;

        let mut restocked = Vec::new();
        if effect.restock {
            for (product_id, quantity) in order.quantities() {
                match tx.get::<Product>(&product_id)? {
                    Some(mut product) => {
                        product.stock = product.stock.saturating_add(quantity);
                        product.updated_at = now;
                        restocked.push(product);
                    }
                    None => {
                        tracing::warn!(%product_id, order_id = %order.id, "cannot restock deleted product");
                    }
                }
            }
        }

        let product_docs = Tx::encode_all(&restocked)?;
        let order_doc = Tx::encode_all(std::slice::from_ref(&order))?;
        tx.put_encoded(Product::resource_name(), product_docs);
        tx.put_encoded(Order::resource_name(), order_doc);

        if effect.restock {
            tracing::info!(order_id = %order.id, products = restocked.len(), "order cancelled, stock restored");
        }
        Ok(order)
    }

    async fn update_category(
        &self,
        category_id: &Uuid,
        category: Category,
    ) -> ShopResult<Category> {
        let mut guard = self.write()?;
        let mut tx = Tx {
            collections: &mut guard,
        };

        let existing = tx
            .get::<Category>(category_id)?
            .ok_or_else(|| ShopError::not_found("category", category_id))?;

        let doc = encode(&category)?;
        if let Some(collection) = tx.collections.get(Category::resource_name()) {
            check_unique(Category::resource_name(), collection, category_id, &doc)?;
        }

        let mut moved = Vec::new();
        if existing.name != category.name {
            for mut product in tx.all::<Product>()? {
                if product.in_category(&existing.name) {
                    product.category = category.name.clone();
                    product.updated_at = category.updated_at;
                    moved.push(product);
                }
            }
        }

        let product_docs = Tx::encode_all(&moved)?;
        tx.put_encoded(Product::resource_name(), product_docs);
        tx.put_encoded(Category::resource_name(), vec![(*category_id, doc)]);

        if !moved.is_empty() {
            tracing::info!(
                category = %category.name,
                products = moved.len(),
                "category renamed, products moved"
            );
        }
        Ok(category)
    }

    async fn delete_category(&self, category_id: &Uuid) -> ShopResult<()> {
        let mut guard = self.write()?;
        let mut tx = Tx {
            collections: &mut guard,
        };

        let existing = tx
            .get::<Category>(category_id)?
            .ok_or_else(|| ShopError::not_found("category", category_id))?;

        let referencing = tx
            .all::<Product>()?
            .iter()
            .filter(|p| p.in_category(&existing.name))
            .count();
        if referencing > 0 {
            return Err(ShopError::category_in_use(&existing.name, referencing as u64));
        }

        if let Some(collection) = tx.collections.get_mut(Category::resource_name()) {
            collection.remove(category_id);
        }
        Ok(())
    }

    async fn add_review(&self, product_id: &Uuid, review: Review) -> ShopResult<Product> {
        let mut guard = self.write()?;
        let mut tx = Tx {
            collections: &mut guard,
        };

        let mut product = tx
            .get::<Product>(product_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| ShopError::not_found("product", product_id))?;
        product.add_review(review)?;

        let docs = Tx::encode_all(std::slice::from_ref(&product))?;
        tx.put_encoded(Product::resource_name(), docs);
        Ok(product)
    }

    async fn update_product(&self, product_id: &Uuid, patch: ProductPatch) -> ShopResult<Product> {
        let mut guard = self.write()?;
        let mut tx = Tx {
            collections: &mut guard,
        };

        let mut product = tx
            .get::<Product>(product_id)?
            .ok_or_else(|| ShopError::not_found("product", product_id))?;
        product.apply_patch(patch);

        let docs = Tx::encode_all(std::slice::from_ref(&product))?;
        tx.put_encoded(Product::resource_name(), docs);
        Ok(product)
    }
}
