//! Authentication and authorization middleware
//!
//! [`authenticate`] runs once for every request and attaches an
//! [`AuthContext`] to it. [`restrict_to`] guards a route group with an
//! [`AuthPolicy`].

use crate::core::auth::{AuthContext, AuthPolicy, AuthProvider, Principal, Role, bearer_token};
use crate::core::credentials::TokenService;
use crate::core::error::{ShopError, ShopResult};
use crate::storage::Repositories;
use async_trait::async_trait;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::{self, Next};
use axum::response::Response;
use std::sync::Arc;

/// Resolves bearer tokens to the stored customer or admin they name
#[derive(Clone)]
pub struct JwtAuthProvider {
    tokens: TokenService,
    repos: Repositories,
}

impl JwtAuthProvider {
    pub fn new(tokens: TokenService, repos: Repositories) -> Self {
        Self { tokens, repos }
    }

    async fn load_principal(&self, id: &uuid::Uuid, role: Role) -> ShopResult<Option<Principal>> {
        let principal = match role {
            Role::Customer => self.repos.users.get(id).await?.map(|u| u.principal()),
            Role::Admin | Role::SuperAdmin => {
                self.repos.admins.get(id).await?.map(|a| a.principal())
            }
        };
        Ok(principal)
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn extract_context(&self, headers: &HeaderMap) -> ShopResult<AuthContext> {
        let Some(token) = bearer_token(headers)? else {
            return Ok(AuthContext::Anonymous);
        };
        let claims = self.tokens.verify(token)?;

        let principal = self
            .load_principal(&claims.id, claims.role)
            .await?
            .ok_or_else(|| ShopError::Unauthorized("Account no longer exists".to_string()))?;
        if !principal.is_active {
            return Err(ShopError::Forbidden("Account is deactivated".to_string()));
        }

        Ok(AuthContext::Principal(principal))
    }
}

/// Attach the request's [`AuthContext`] or reject unusable credentials
pub async fn authenticate(
    State(provider): State<Arc<dyn AuthProvider>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ShopError> {
    let context = match provider.extract_context(req.headers()).await {
        Ok(context) => context,
        Err(err) => {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                reason = %err,
                "authentication rejected"
            );
            return Err(err);
        }
    };
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// Guard every route of `router` with `policy`
///
/// Must sit inside [`authenticate`]; a request without context is treated
/// as anonymous.
pub fn restrict_to<S>(router: Router<S>, policy: AuthPolicy) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn(move |req: Request, next: Next| {
        let policy = policy.clone();
        async move {
            let context = req
                .extensions()
                .get::<AuthContext>()
                .cloned()
                .unwrap_or(AuthContext::Anonymous);
            policy.authorize(&context)?;
            Ok::<_, ShopError>(next.run(req).await)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Admin, AdminRole, User};
    use axum::http::HeaderValue;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_no_header_is_anonymous() {
        let provider = JwtAuthProvider::new(TokenService::new(SECRET, 1), Repositories::in_memory());
        let context = provider.extract_context(&HeaderMap::new()).await.unwrap();
        assert_eq!(context, AuthContext::Anonymous);
    }

    #[tokio::test]
    async fn test_valid_token_resolves_stored_principal() {
        let repos = Repositories::in_memory();
        let tokens = TokenService::new(SECRET, 1);
        let user = repos
            .users
            .create(User::new("Ann".into(), "ann@example.com", "h".into(), None))
            .await
            .unwrap();

        let provider = JwtAuthProvider::new(tokens.clone(), repos);
        let token = tokens.issue(&user.principal()).unwrap();
        let context = provider.extract_context(&headers(&token)).await.unwrap();
        assert_eq!(context.principal_id(), Some(user.id));
        assert_eq!(context.role(), Some(Role::Customer));
    }

    #[tokio::test]
    async fn test_unknown_principal_is_unauthorized() {
        let tokens = TokenService::new(SECRET, 1);
        let ghost = User::new("Ghost".into(), "ghost@example.com", "h".into(), None);
        let provider = JwtAuthProvider::new(tokens.clone(), Repositories::in_memory());

        let err = provider
            .extract_context(&headers(&tokens.issue(&ghost.principal()).unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_deactivated_admin_is_forbidden() {
        let repos = Repositories::in_memory();
        let tokens = TokenService::new(SECRET, 1);
        let mut admin = Admin::new("Op".into(), "op@example.com", "h".into(), AdminRole::Admin);
        admin.is_active = false;
        let admin = repos.admins.create(admin).await.unwrap();

        let provider = JwtAuthProvider::new(tokens.clone(), repos);
        let err = provider
            .extract_context(&headers(&tokens.issue(&admin.principal()).unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let provider = JwtAuthProvider::new(TokenService::new(SECRET, 1), Repositories::in_memory());
        let err = provider
            .extract_context(&headers("garbage"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }
}
