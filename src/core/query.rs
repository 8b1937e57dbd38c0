//! Query parameters and pagination utilities

use crate::entities::{Order, OrderStatus, PaymentStatus, Product};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

/// Page window requested by a client
///
/// Page numbers start at 1; the limit is clamped to `1..=MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn new(page: Option<usize>, limit: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Cut one page out of an already filtered and sorted list
    pub fn apply<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let total = items.len();
        let start = (self.page - 1) * self.limit;
        let data = items.into_iter().skip(start).take(self.limit).collect();
        PaginatedResponse {
            data,
            pagination: PaginationMeta::new(self.page, self.limit, total),
        }
    }
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(limit);
        let start = (page - 1) * limit;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + limit < total,
            has_prev: page > 1,
        }
    }
}

/// Catalog ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ProductSort {
    #[default]
    #[serde(rename = "newest")]
    Newest,
    #[serde(rename = "price:asc")]
    PriceAsc,
    #[serde(rename = "price:desc")]
    PriceDesc,
    #[serde(rename = "rating:desc")]
    RatingDesc,
    #[serde(rename = "name:asc")]
    NameAsc,
}

impl ProductSort {
    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self {
            ProductSort::Newest => b.created_at.cmp(&a.created_at),
            ProductSort::PriceAsc => a.price.total_cmp(&b.price),
            ProductSort::PriceDesc => b.price.total_cmp(&a.price),
            ProductSort::RatingDesc => b.rating.total_cmp(&a.rating),
            ProductSort::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    }
}

/// `GET /products` and `GET /admin/products` query string
///
/// ```text
/// GET /products?page=2&limit=10&category=lighting&q=lamp&minPrice=10&sort=price:asc
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(default)]
    pub sort: ProductSort,
}

impl ProductQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty())
            && !product.in_category(category)
        {
            return false;
        }
        if let Some(q) = self.q.as_deref()
            && !matches_text(product, q)
        {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Filter, sort and paginate
    pub fn apply(&self, products: Vec<Product>) -> PaginatedResponse<Product> {
        let mut matching: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        matching.sort_by(|a, b| self.sort.compare(a, b));
        self.page_request().apply(matching)
    }
}

/// Case-insensitive substring match over name, description, brand and
/// category
pub fn matches_text(product: &Product, q: &str) -> bool {
    let needle = q.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    product.name.to_lowercase().contains(&needle)
        || product.description.to_lowercase().contains(&needle)
        || product.category.to_lowercase().contains(&needle)
        || product
            .brand
            .as_deref()
            .is_some_and(|b| b.to_lowercase().contains(&needle))
}

/// `GET /orders` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl OrderQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| order.order_status == s)
            && self.payment_status.is_none_or(|s| order.payment_status == s)
    }
}

/// `GET /admin/users` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    /// Substring of name or email
    pub q: Option<String>,
}

impl AccountQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn matches(&self, name: &str, email: &str) -> bool {
        match self.q.as_deref().map(|q| q.trim().to_lowercase()) {
            Some(q) if !q.is_empty() => {
                name.to_lowercase().contains(&q) || email.to_lowercase().contains(&q)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: f64, category: &str) -> Product {
        Product::new(name.into(), format!("{} desc", name), price, category.into(), 3, None)
    }

    #[test]
    fn test_page_request_defaults_and_clamps() {
        let page = PageRequest::new(None, None);
        assert_eq!(page, PageRequest { page: 1, limit: 20 });

        let page = PageRequest::new(Some(0), Some(1000));
        assert_eq!(page, PageRequest { page: 1, limit: MAX_LIMIT });
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(1, 20, 145);
        assert_eq!(meta.total, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(!meta.has_prev);
        assert!(meta.has_next);

        let empty = PaginationMeta::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_apply_cuts_page() {
        let response = PageRequest::new(Some(2), Some(2)).apply(vec![1, 2, 3, 4, 5]);
        assert_eq!(response.data, vec![3, 4]);
        assert!(response.pagination.has_next);
        assert!(response.pagination.has_prev);
    }

    #[test]
    fn test_product_query_filters_and_sorts() {
        let products = vec![
            product("Desk Lamp", 30.0, "Lighting"),
            product("Floor Lamp", 80.0, "Lighting"),
            product("Chair", 50.0, "Furniture"),
        ];
        let query = ProductQuery {
            category: Some("lighting".into()),
            max_price: Some(60.0),
            ..Default::default()
        };
        let page = query.apply(products.clone());
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].name, "Desk Lamp");

        let query = ProductQuery {
            q: Some("LAMP".into()),
            sort: ProductSort::PriceDesc,
            ..Default::default()
        };
        let page = query.apply(products);
        let names: Vec<_> = page.data.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Floor Lamp", "Desk Lamp"]);
    }

    #[test]
    fn test_sort_parses_from_query_string() {
        let query: ProductQuery =
            serde_json::from_value(serde_json::json!({"sort": "price:asc", "minPrice": 5.0}))
                .unwrap();
        assert_eq!(query.sort, ProductSort::PriceAsc);
        assert_eq!(query.min_price, Some(5.0));
    }

    #[test]
    fn test_account_query_matches_name_or_email() {
        let query = AccountQuery {
            q: Some("ann".into()),
            ..Default::default()
        };
        assert!(query.matches("Ann Lee", "x@example.com"));
        assert!(query.matches("Bob", "joann@example.com"));
        assert!(!query.matches("Bob", "bob@example.com"));
    }
}
