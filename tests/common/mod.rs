//! Shared helpers for HTTP integration tests
//!
//! `TestApp` wires the full router over fresh in-memory storage and exposes
//! the repositories, so tests can seed documents directly and assert on
//! stored state after each request.

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{Value, json};
use storefront::config::AppConfig;
use storefront::core::credentials::{TokenService, hash_password};
use storefront::entities::{Admin, AdminRole, Category, Product, User};
use storefront::server::ServerBuilder;
use storefront::storage::Repositories;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub server: TestServer,
    pub repos: Repositories,
    pub tokens: TokenService,
}

/// An account seeded straight into storage plus a valid token for it
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        let repos = Repositories::in_memory();

        let app = ServerBuilder::new()
            .with_config(config.clone())
            .with_repositories(repos.clone())
            .build()
            .expect("Failed to build router");
        let server = TestServer::new(app).expect("Failed to create test server");

        Self {
            server,
            repos,
            tokens: TokenService::new(SECRET, config.auth.token_ttl_hours),
        }
    }

    pub async fn customer(&self, name: &str) -> Account {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = User::new(
            name.to_string(),
            &email,
            hash_password(PASSWORD).unwrap(),
            None,
        );
        let user = self.repos.users.create(user).await.unwrap();
        Account {
            id: user.id,
            token: self.tokens.issue(&user.principal()).unwrap(),
            email: user.email,
        }
    }

    pub async fn admin(&self, name: &str, role: AdminRole) -> Account {
        let email = format!("{}@staff.example.com", name.to_lowercase());
        let admin = Admin::new(
            name.to_string(),
            &email,
            hash_password(PASSWORD).unwrap(),
            role,
        );
        let admin = self.repos.admins.create(admin).await.unwrap();
        Account {
            id: admin.id,
            token: self.tokens.issue(&admin.principal()).unwrap(),
            email: admin.email,
        }
    }

    pub async fn category(&self, name: &str) -> Category {
        self.repos
            .categories
            .create(Category::new(name.to_string(), None))
            .await
            .unwrap()
    }

    pub async fn product(&self, name: &str, price: f64, stock: i64, category: &str) -> Product {
        self.repos
            .products
            .create(Product::new(
                name.to_string(),
                format!("{} description", name),
                price,
                category.to_string(),
                stock,
                None,
            ))
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, id: &Uuid) -> i64 {
        self.repos.products.get(id).await.unwrap().unwrap().stock
    }
}

pub fn shipping_address() -> Value {
    json!({
        "fullName": "Ada Lovelace",
        "address": "12 Analytical Way",
        "city": "London",
        "postalCode": "N1 9GU",
        "country": "UK"
    })
}

pub fn order_body(lines: &[(Uuid, i64)]) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|(product, quantity)| json!({ "product": product, "quantity": quantity }))
        .collect();
    json!({
        "orderItems": items,
        "shippingAddress": shipping_address(),
        "paymentMethod": "card"
    })
}
