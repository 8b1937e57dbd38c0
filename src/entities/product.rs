//! Product documents with embedded reviews

use crate::core::entity::Record;
use crate::core::error::{ShopError, ShopResult};
use crate::impl_record;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

/// Accepted shape for a SKU: three-character prefix, dash, six characters
pub static SKU_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{3}-[A-Z0-9]{6}$").expect("SKU pattern compiles"));

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Name of the category this product belongs to
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub rating: f64,
    pub review_count: u32,
    pub is_active: bool,
    pub sku: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer review embedded in a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl_record!(Product, "products", "product");

impl Product {
    /// Create an active product; a SKU is generated when none is given
    pub fn new(
        name: String,
        description: String,
        price: f64,
        category: String,
        stock: i64,
        sku: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let sku = sku.unwrap_or_else(|| generate_sku(&category));
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            price,
            category,
            brand: None,
            stock,
            images: Vec::new(),
            reviews: Vec::new(),
            rating: 0.0,
            review_count: 0,
            is_active: true,
            sku,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the product can be ordered in the given quantity
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }

    /// Case-insensitive category membership
    pub fn in_category(&self, category: &str) -> bool {
        self.category.trim().to_lowercase() == category.trim().to_lowercase()
    }

    /// Append a review; each customer reviews a product once
    pub fn add_review(&mut self, review: Review) -> ShopResult<()> {
        if self.reviews.iter().any(|r| r.user_id == review.user_id) {
            return Err(ShopError::rule("Product already reviewed"));
        }
        self.reviews.push(review);
        self.recompute_rating();
        self.touch();
        Ok(())
    }

    /// rating = mean of review ratings, one decimal; 0 without reviews
    pub fn recompute_rating(&mut self) {
        self.review_count = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let sum: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            let mean = f64::from(sum) / self.reviews.len() as f64;
            (mean * 10.0).round() / 10.0
        };
    }
}

/// Admin edits to a product; absent fields are left alone.
///
/// Stock, reviews and rating move independently of admin edits, so a patch
/// never carries a whole product back into storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    /// Already resolved to the stored category's name
    pub category: Option<String>,
    pub stock: Option<i64>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    pub sku: Option<String>,
    pub is_active: Option<bool>,
}

impl Product {
    /// Apply only the fields the patch sets
    pub fn apply_patch(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if patch.brand.is_some() {
            self.brand = patch.brand;
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(sku) = patch.sku {
            self.sku = sku;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.touch();
    }
}

impl Review {
    pub fn new(user_id: Uuid, name: String, rating: u8, comment: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}

/// `ELE-1A2B3C`: category prefix plus six hex characters
pub fn generate_sku(category: &str) -> String {
    let mut prefix: String = category
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    while prefix.len() < 3 {
        prefix.push('X');
    }

    let suffix = Uuid::new_v4().simple().to_string()[..6].to_ascii_uppercase();
    format!("{}-{}", prefix, suffix)
}
