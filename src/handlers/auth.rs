//! `/auth` routes: registration, login and the caller's own profile

use crate::core::auth::AuthPolicy;
use crate::core::error::ShopResult;
use crate::core::extractors::{CurrentPrincipal, ValidJson};
use crate::entities::AccountView;
use crate::handlers::admin::list_admins;
use crate::server::middleware::restrict_to;
use crate::server::state::AppState;
use crate::services::accounts::{self, AccountKind, ProfileChanges, Session};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 2, max = 50))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(customer_login))
        .route("/admin/login", post(admin_login));

    let own = restrict_to(
        Router::new()
            .route("/profile", get(profile).put(update_profile))
            .route("/password", put(change_password)),
        AuthPolicy::Authenticated,
    );

    let superadmin = restrict_to(
        Router::new().route("/admins", get(list_admins)),
        AuthPolicy::SuperAdminOnly,
    );

    public.merge(own).merge(superadmin)
}

async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> ShopResult<(StatusCode, Json<Session>)> {
    let session = accounts::register_customer(
        &state.repos,
        &state.tokens,
        body.name.trim().to_string(),
        &body.email,
        &body.password,
        body.phone,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn customer_login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> ShopResult<Json<Session>> {
    let session = accounts::login(
        &state.repos,
        &state.tokens,
        AccountKind::Customer,
        &body.email,
        &body.password,
    )
    .await?;
    Ok(Json(session))
}

async fn admin_login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> ShopResult<Json<Session>> {
    let session = accounts::login(
        &state.repos,
        &state.tokens,
        AccountKind::Admin,
        &body.email,
        &body.password,
    )
    .await?;
    Ok(Json(session))
}

async fn profile(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ShopResult<Json<AccountView>> {
    Ok(Json(accounts::profile(&state.repos, &principal).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidJson(body): ValidJson<ProfileRequest>,
) -> ShopResult<Json<AccountView>> {
    let changes = ProfileChanges {
        name: body.name,
        email: body.email,
        phone: body.phone,
    };
    Ok(Json(
        accounts::update_profile(&state.repos, &principal, changes).await?,
    ))
}

async fn change_password(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidJson(body): ValidJson<PasswordRequest>,
) -> ShopResult<Json<MessageResponse>> {
    accounts::change_password(
        &state.repos,
        &principal,
        &body.current_password,
        &body.new_password,
    )
    .await?;
    Ok(Json(MessageResponse {
        message: "Password updated",
    }))
}
