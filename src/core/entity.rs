//! Record trait defining the storage abstraction for every document type

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Base trait for all persisted documents.
///
/// Every document has:
/// - id: Unique identifier
/// - createdAt: Creation timestamp
/// - updatedAt: Last modification timestamp
///
/// Storage backends are generic over this trait: documents are serialized
/// through serde, so the JSON shape of a record is also its stored shape.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The collection name (e.g., "products", "orders")
    fn resource_name() -> &'static str;

    /// The singular name used in error messages (e.g., "product")
    fn resource_name_singular() -> &'static str;

    /// Get the unique identifier for this record
    fn id(&self) -> Uuid;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;

    /// Bump `updated_at` to now
    fn touch(&mut self);
}

/// Implements [`Record`] for a struct with `id`, `created_at` and
/// `updated_at` fields.
#[macro_export]
macro_rules! impl_record {
    ($type:ty, $plural:expr, $singular:expr) => {
        impl $crate::core::entity::Record for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
            }
        }
    };
}
