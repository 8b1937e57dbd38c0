//! `/admin` routes: dashboard, catalog management, customers and staff

use crate::core::auth::AuthPolicy;
use crate::core::entity::Record;
use crate::core::error::{ShopError, ShopResult};
use crate::core::extractors::{CurrentPrincipal, EntityId, QueryParams, ValidJson};
use crate::core::query::{AccountQuery, PaginatedResponse, ProductQuery};
use crate::entities::category::slugify;
use crate::entities::product::SKU_PATTERN;
use crate::entities::{AccountView, AdminRole, Category, Order, Product, ProductPatch};
use crate::server::middleware::restrict_to;
use crate::server::state::AppState;
use crate::services::accounts;
use crate::services::dashboard::{self, DashboardStats};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0))]
    pub price: f64,
    #[validate(length(min = 1))]
    pub category: String,
    #[validate(range(min = 0))]
    pub stock: i64,
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(regex(path = *SKU_PATTERN, message = "SKU must look like ABC-123456"))]
    pub sku: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub price: Option<f64>,
    #[validate(length(min = 1))]
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i64>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    #[validate(regex(path = *SKU_PATTERN, message = "SKU must look like ABC-123456"))]
    pub sku: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default = "default_admin_role")]
    pub role: AdminRole,
}

fn default_admin_role() -> AdminRole {
    AdminRole::Admin
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    pub user: AccountView,
    pub orders: Vec<Order>,
}

pub fn routes() -> Router<AppState> {
    let staff = restrict_to(
        Router::new()
            .route("/dashboard", get(get_dashboard))
            .route("/products", get(list_products).post(create_product))
            .route("/products/{id}", put(update_product).delete(delete_product))
            .route("/categories", get(list_categories).post(create_category))
            .route(
                "/categories/{id}",
                put(update_category).delete(delete_category),
            )
            .route("/users", get(list_users))
            .route("/users/{id}", get(get_user))
            .route("/users/{id}/status", put(set_user_status)),
        AuthPolicy::AdminOnly,
    );

    let superadmin = restrict_to(
        Router::new()
            .route("/admins", get(list_admins).post(create_admin))
            .route("/admins/{id}", put(update_admin).delete(delete_admin)),
        AuthPolicy::SuperAdminOnly,
    );

    staff.merge(superadmin)
}

async fn get_dashboard(State(state): State<AppState>) -> ShopResult<Json<DashboardStats>> {
    Ok(Json(dashboard::load(&state.repos).await?))
}

/// The stored category a product refers to, matched case-insensitively
async fn existing_category(state: &AppState, name: &str) -> ShopResult<Category> {
    state
        .repos
        .categories
        .search("slug", &slugify(name))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ShopError::validation(format!("Category '{}' does not exist", name.trim())))
}

/// Admin listing includes inactive products
async fn list_products(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
) -> ShopResult<Json<PaginatedResponse<Product>>> {
    Ok(Json(query.apply(state.repos.products.list().await?)))
}

async fn create_product(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateProductRequest>,
) -> ShopResult<(StatusCode, Json<Product>)> {
    let category = existing_category(&state, &body.category).await?;

    let mut product = Product::new(
        body.name.trim().to_string(),
        body.description,
        body.price,
        category.name,
        body.stock,
        body.sku,
    );
    product.brand = body.brand;
    product.images = body.images;
    if let Some(active) = body.is_active {
        product.is_active = active;
    }

    let product = state.repos.products.create(product).await?;
    tracing::info!(product_id = %product.id, sku = %product.sku, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidJson(body): ValidJson<UpdateProductRequest>,
) -> ShopResult<Json<Product>> {
    let category = match body.category {
        Some(category) => Some(existing_category(&state, &category).await?.name),
        None => None,
    };
    let patch = ProductPatch {
        name: body.name.map(|name| name.trim().to_string()),
        description: body.description,
        price: body.price,
        category,
        stock: body.stock,
        brand: body.brand,
        images: body.images,
        sku: body.sku,
        is_active: body.is_active,
    };

    let product = state.repos.commerce.update_product(&id, patch).await?;
    tracing::info!(product_id = %product.id, "product updated");
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ShopResult<StatusCode> {
    if state.repos.products.get(&id).await?.is_none() {
        return Err(ShopError::not_found("product", id));
    }
    state.repos.products.delete(&id).await?;
    tracing::info!(product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_categories(State(state): State<AppState>) -> ShopResult<Json<Vec<Category>>> {
    let mut categories = state.repos.categories.list().await?;
    categories.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateCategoryRequest>,
) -> ShopResult<(StatusCode, Json<Category>)> {
    let category = Category::new(body.name, body.description);
    if category.name.is_empty() {
        return Err(ShopError::validation("Category name is required"));
    }
    let category = state.repos.categories.create(category).await?;
    tracing::info!(category_id = %category.id, name = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidJson(body): ValidJson<UpdateCategoryRequest>,
) -> ShopResult<Json<Category>> {
    let mut category = state
        .repos
        .categories
        .get(&id)
        .await?
        .ok_or_else(|| ShopError::not_found("category", id))?;

    if let Some(name) = body.name.as_deref().map(str::trim) {
        if name.is_empty() {
            return Err(ShopError::validation("Category name is required"));
        }
        category.rename(name);
    }
    if body.description.is_some() {
        category.description = body.description;
    }
    if let Some(active) = body.is_active {
        category.is_active = active;
    }

    Ok(Json(state.repos.commerce.update_category(&id, category).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ShopResult<StatusCode> {
    state.repos.commerce.delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AccountQuery>,
) -> ShopResult<Json<PaginatedResponse<AccountView>>> {
    let users: Vec<AccountView> = state
        .repos
        .users
        .list()
        .await?
        .iter()
        .filter(|u| query.matches(&u.name, &u.email))
        .map(AccountView::from)
        .collect();
    Ok(Json(query.page_request().apply(users)))
}

async fn get_user(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ShopResult<Json<CustomerDetail>> {
    let user = state
        .repos
        .users
        .get(&id)
        .await?
        .ok_or_else(|| ShopError::not_found("user", id))?;
    let orders = state.repos.orders.search("userId", &id.to_string()).await?;
    Ok(Json(CustomerDetail {
        user: AccountView::from(&user),
        orders,
    }))
}

async fn set_user_status(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidJson(body): ValidJson<AccountStatusRequest>,
) -> ShopResult<Json<AccountView>> {
    let mut user = state
        .repos
        .users
        .get(&id)
        .await?
        .ok_or_else(|| ShopError::not_found("user", id))?;
    user.is_active = body.is_active;
    user.touch();
    let user = state.repos.users.update(&id, user).await?;
    tracing::info!(user_id = %id, is_active = user.is_active, "customer status changed");
    Ok(Json(AccountView::from(&user)))
}

pub(crate) async fn list_admins(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AccountQuery>,
) -> ShopResult<Json<PaginatedResponse<AccountView>>> {
    let admins: Vec<AccountView> = state
        .repos
        .admins
        .list()
        .await?
        .iter()
        .filter(|a| query.matches(&a.name, &a.email))
        .map(AccountView::from)
        .collect();
    Ok(Json(query.page_request().apply(admins)))
}

async fn create_admin(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateAdminRequest>,
) -> ShopResult<(StatusCode, Json<AccountView>)> {
    let admin = accounts::create_admin(
        &state.repos,
        body.name.trim().to_string(),
        &body.email,
        &body.password,
        body.role,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(AccountView::from(&admin))))
}

async fn update_admin(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidJson(body): ValidJson<UpdateAdminRequest>,
) -> ShopResult<Json<AccountView>> {
    let mut admin = accounts::load_admin(&state.repos, &id).await?;

    if id == principal.id {
        if body.role.is_some_and(|r| r != AdminRole::SuperAdmin) {
            return Err(ShopError::rule("You cannot demote yourself"));
        }
        if body.is_active == Some(false) {
            return Err(ShopError::rule("You cannot deactivate yourself"));
        }
    }

    if let Some(name) = body.name {
        admin.name = name.trim().to_string();
    }
    if let Some(role) = body.role {
        admin.role = role;
    }
    if let Some(active) = body.is_active {
        admin.is_active = active;
    }
    admin.touch();

    let admin = state.repos.admins.update(&id, admin).await?;
    tracing::info!(admin_id = %id, role = ?admin.role, is_active = admin.is_active, "admin updated");
    Ok(Json(AccountView::from(&admin)))
}

async fn delete_admin(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ShopResult<StatusCode> {
    if id == principal.id {
        return Err(ShopError::rule("You cannot delete yourself"));
    }
    accounts::load_admin(&state.repos, &id).await?;
    state.repos.admins.delete(&id).await?;
    tracing::info!(admin_id = %id, "admin deleted");
    Ok(StatusCode::NO_CONTENT)
}
