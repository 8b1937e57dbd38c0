//! `/products` routes: the public catalog and customer reviews

use crate::core::auth::AuthPolicy;
use crate::core::error::{ShopError, ShopResult};
use crate::core::extractors::{CurrentPrincipal, EntityId, QueryParams, ValidJson};
use crate::core::query::{PaginatedResponse, ProductQuery};
use crate::entities::{Category, Product, Review};
use crate::server::middleware::restrict_to;
use crate::server::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(min = 1, max = 1000))]
    pub comment: String,
}

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_products))
        .route("/search", get(search_products))
        .route("/categories", get(list_categories))
        .route("/{id}", get(get_product));

    let customer = restrict_to(
        Router::new().route("/{id}/reviews", post(add_review)),
        AuthPolicy::CustomerOnly,
    );

    public.merge(customer)
}

async fn active_products(state: &AppState) -> ShopResult<Vec<Product>> {
    Ok(state
        .repos
        .products
        .list()
        .await?
        .into_iter()
        .filter(|p| p.is_active)
        .collect())
}

async fn list_products(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
) -> ShopResult<Json<PaginatedResponse<Product>>> {
    Ok(Json(query.apply(active_products(&state).await?)))
}

async fn search_products(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
) -> ShopResult<Json<PaginatedResponse<Product>>> {
    if query.q.as_deref().is_none_or(|q| q.trim().is_empty()) {
        return Err(ShopError::validation("Search query 'q' is required"));
    }
    Ok(Json(query.apply(active_products(&state).await?)))
}

async fn list_categories(State(state): State<AppState>) -> ShopResult<Json<Vec<Category>>> {
    let mut categories: Vec<Category> = state
        .repos
        .categories
        .list()
        .await?
        .into_iter()
        .filter(|c| c.is_active)
        .collect();
    categories.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(Json(categories))
}

async fn get_product(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> ShopResult<Json<Product>> {
    let product = state
        .repos
        .products
        .get(&id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| ShopError::not_found("product", id))?;
    Ok(Json(product))
}

async fn add_review(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidJson(body): ValidJson<ReviewRequest>,
) -> ShopResult<(StatusCode, Json<Product>)> {
    let review = Review::new(principal.id, principal.name, body.rating, body.comment);
    let product = state.repos.commerce.add_review(&id, review).await?;
    tracing::info!(product_id = %id, rating = product.rating, "review added");
    Ok((StatusCode::CREATED, Json(product)))
}
