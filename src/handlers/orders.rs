//! `/orders` routes: checkout, order history and status changes

use crate::core::auth::{AuthPolicy, Principal};
use crate::core::error::{ShopError, ShopResult};
use crate::core::extractors::{CurrentPrincipal, EntityId, QueryParams, ValidJson};
use crate::core::query::{OrderQuery, PaginatedResponse};
use crate::entities::{
    Order, OrderDraft, OrderLine, ShippingAddress, StatusChange, StatusUpdate,
};
use crate::server::middleware::restrict_to;
use crate::server::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Checkout payload
///
/// Any price fields a client sends are ignored; totals come from the
/// current product records.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    #[validate(nested)]
    pub order_items: Vec<OrderLine>,
    #[validate(nested)]
    pub shipping_address: ShippingAddress,
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    #[serde(flatten)]
    pub update: StatusUpdate,
}

pub fn routes() -> Router<AppState> {
    let customer = restrict_to(
        Router::new()
            .route("/", post(place_order))
            .route("/mine", get(my_orders))
            .route("/{id}/cancel", put(cancel_order)),
        AuthPolicy::CustomerOnly,
    );

    let authenticated = restrict_to(
        Router::new().route("/{id}", get(get_order)),
        AuthPolicy::Authenticated,
    );

    let admin = restrict_to(
        Router::new()
            .route("/", get(list_orders))
            .route("/{id}/status", put(update_status)),
        AuthPolicy::AdminOnly,
    );

    customer.merge(authenticated).merge(admin)
}

async fn place_order(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidJson(body): ValidJson<PlaceOrderRequest>,
) -> ShopResult<(StatusCode, Json<Order>)> {
    let draft = OrderDraft {
        user_id: principal.id,
        lines: body.order_items,
        shipping_address: body.shipping_address,
        payment_method: body.payment_method,
    };
    let order = state.repos.commerce.place_order(draft, state.pricing).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn my_orders(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ShopResult<Json<Vec<Order>>> {
    let orders = state
        .repos
        .orders
        .search("userId", &principal.id.to_string())
        .await?;
    Ok(Json(orders))
}

/// Load an order the principal may see; other customers get 404
async fn visible_order(state: &AppState, principal: &Principal, id: Uuid) -> ShopResult<Order> {
    state
        .repos
        .orders
        .get(&id)
        .await?
        .filter(|o| principal.role.is_staff() || o.user_id == principal.id)
        .ok_or_else(|| ShopError::not_found("order", id))
}

async fn get_order(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ShopResult<Json<Order>> {
    Ok(Json(visible_order(&state, &principal, id).await?))
}

async fn cancel_order(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ShopResult<Json<Order>> {
    let order = state
        .repos
        .commerce
        .change_order_status(&id, StatusChange::customer_cancel(principal.id))
        .await?;
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OrderQuery>,
) -> ShopResult<Json<PaginatedResponse<Order>>> {
    let orders: Vec<Order> = state
        .repos
        .orders
        .list()
        .await?
        .into_iter()
        .filter(|o| query.matches(o))
        .collect();
    Ok(Json(query.page_request().apply(orders)))
}

async fn update_status(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidJson(body): ValidJson<StatusRequest>,
) -> ShopResult<Json<Order>> {
    let order = state
        .repos
        .commerce
        .change_order_status(&id, StatusChange::admin(body.update))
        .await?;
    Ok(Json(order))
}
