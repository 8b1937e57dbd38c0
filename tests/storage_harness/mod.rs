//! Shared test harness for storage backend testing
//!
//! Provides document builders and two macro-generated contract suites:
//! - `data_service_tests!` for the generic `DataService<T>` operations
//! - `commerce_service_tests!` for the transactional `CommerceService`
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//!
//! data_service_tests!(InMemoryStore::new());
//! commerce_service_tests!(InMemoryStore::new());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod commerce_tests;
#[macro_use]
pub mod data_service_tests;

use storefront::entities::{
    Category, OrderDraft, OrderLine, PricingPolicy, Product, ShippingAddress, User,
};
use uuid::Uuid;

pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Grace Hopper".to_string(),
        address: "1 Compiler Lane".to_string(),
        city: "Arlington".to_string(),
        postal_code: "22201".to_string(),
        country: "US".to_string(),
        phone: None,
    }
}

pub fn draft(user_id: Uuid, lines: &[(Uuid, i64)]) -> OrderDraft {
    OrderDraft {
        user_id,
        lines: lines
            .iter()
            .map(|(product, quantity)| OrderLine {
                product: *product,
                quantity: *quantity,
                size: None,
                color: None,
            })
            .collect(),
        shipping_address: address(),
        payment_method: "card".to_string(),
    }
}

pub fn pricing() -> PricingPolicy {
    PricingPolicy::default()
}

pub fn product(name: &str, price: f64, stock: i64, category: &str) -> Product {
    Product::new(
        name.to_string(),
        format!("{} for testing", name),
        price,
        category.to_string(),
        stock,
        None,
    )
}

pub fn category(name: &str) -> Category {
    Category::new(name.to_string(), None)
}

pub fn user(name: &str) -> User {
    User::new(
        name.to_string(),
        &format!("{}@example.com", name.to_lowercase()),
        "hash".to_string(),
        None,
    )
}
