//! Authorization for the storefront
//!
//! Customers and administrators are both represented by a [`Principal`]
//! tagged with a [`Role`]. Authentication produces an [`AuthContext`];
//! route groups declare an [`AuthPolicy`] that the context must satisfy.

use crate::core::error::{ShopError, ShopResult};
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of authenticated actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Admin and superadmin both count as staff
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// An authenticated actor attached to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    /// A verified customer or administrator
    Principal(Principal),

    /// No credentials presented
    Anonymous,
}

impl AuthContext {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthContext::Principal(principal) => Some(principal),
            AuthContext::Anonymous => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.principal().map(|p| p.role)
    }

    /// Check if context represents an admin or superadmin
    pub fn is_admin(&self) -> bool {
        self.role().is_some_and(|r| r.is_staff())
    }

    pub fn is_super_admin(&self) -> bool {
        self.role() == Some(Role::SuperAdmin)
    }

    /// Get the principal id if authenticated
    pub fn principal_id(&self) -> Option<Uuid> {
        self.principal().map(|p| p.id)
    }
}

/// Authorization policy for a route group
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Any authenticated principal
    Authenticated,

    /// Admin or superadmin
    AdminOnly,

    /// Superadmin only
    SuperAdminOnly,

    /// Customers only
    CustomerOnly,
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),

            AuthPolicy::AdminOnly => context.is_admin(),

            AuthPolicy::SuperAdminOnly => context.is_super_admin(),

            AuthPolicy::CustomerOnly => context.role() == Some(Role::Customer),
        }
    }

    /// Like [`check`](Self::check), with the error a refused request gets:
    /// 401 when nobody is signed in, 403 when the wrong principal is.
    pub fn authorize(&self, context: &AuthContext) -> ShopResult<()> {
        if self.check(context) {
            return Ok(());
        }
        match context {
            AuthContext::Anonymous => Err(ShopError::Unauthorized(
                "Authentication required".to_string(),
            )),
            AuthContext::Principal(principal) => Err(ShopError::Forbidden(format!(
                "Role '{}' is not allowed to perform this action",
                principal.role.as_str()
            ))),
        }
    }
}

/// Trait for auth providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extract auth context from request headers
    ///
    /// No credentials yields [`AuthContext::Anonymous`]; credentials that
    /// are present but unusable are an error.
    async fn extract_context(&self, headers: &HeaderMap) -> ShopResult<AuthContext>;
}

/// Provider that treats every request as anonymous
pub struct NoAuthProvider;

#[async_trait]
impl AuthProvider for NoAuthProvider {
    async fn extract_context(&self, _headers: &HeaderMap) -> ShopResult<AuthContext> {
        Ok(AuthContext::Anonymous)
    }
}

/// Bearer token from an `Authorization` header, if any
pub fn bearer_token(headers: &HeaderMap) -> ShopResult<Option<&str>> {
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ShopError::Unauthorized("Malformed Authorization header".to_string()))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(ShopError::Unauthorized(
            "Authorization header must be 'Bearer <token>'".to_string(),
        )),
    }
}
