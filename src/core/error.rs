//! Typed error handling for the storefront API
//!
//! Every handler returns [`ShopError`] on failure. The single
//! [`IntoResponse`] implementation at the bottom of this module is the only
//! place where an error becomes an HTTP status and a JSON body.
//!
//! # Error Categories
//!
//! - `NotFound`: a referenced resource does not exist (404)
//! - `Validation`: malformed or out-of-range input (400)
//! - `Rule`: a business rule refused the operation, e.g. insufficient stock (400)
//! - `Unauthorized`: missing, invalid or expired credentials (401)
//! - `Forbidden`: authenticated but not allowed (403)
//! - `Conflict`: uniqueness or state conflict (409)
//! - `Storage` / `Internal`: backend or unexpected failures (500)
//!
//! # Example
//!
//! ```rust,ignore
//! let product = products
//!     .get(&id)
//!     .await?
//!     .ok_or_else(|| ShopError::not_found("product", id))?;
//! ```

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::ValidationErrorsKind;

/// Result alias used across handlers and commerce services
pub type ShopResult<T> = Result<T, ShopError>;

/// The main error type for the storefront
#[derive(Debug, thiserror::Error)]
pub enum ShopError {
    /// A resource was not found
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    /// Input failed validation
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    /// A business rule rejected the request
    #[error("{message}")]
    Rule {
        message: String,
        details: Option<Value>,
    },

    /// Missing or bad credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated principal lacks permission
    #[error("{0}")]
    Forbidden(String),

    /// Uniqueness or state conflict
    #[error("{0}")]
    Conflict(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `true`; lets clients branch on a single flag
    pub error: bool,
    /// Error code for programmatic handling
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ShopError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        ShopError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ShopError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn rule(message: impl Into<String>) -> Self {
        ShopError::Rule {
            message: message.into(),
            details: None,
        }
    }

    /// Rule violation raised when a product cannot cover the requested quantity
    pub fn insufficient_stock(product_id: Uuid, name: &str, requested: i64, available: i64) -> Self {
        ShopError::Rule {
            message: format!(
                "Insufficient stock for '{}': requested {}, available {}",
                name, requested, available
            ),
            details: Some(json!({
                "productId": product_id,
                "requested": requested,
                "available": available,
            })),
        }
    }

    /// Rule violation raised when deleting a category products still use
    pub fn category_in_use(name: &str, product_count: u64) -> Self {
        ShopError::Rule {
            message: format!(
                "Category '{}' is used by {} product(s) and cannot be deleted",
                name, product_count
            ),
            details: Some(json!({
                "category": name,
                "productCount": product_count,
            })),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShopError::NotFound { .. } => StatusCode::NOT_FOUND,
            ShopError::Validation { .. } | ShopError::Rule { .. } => StatusCode::BAD_REQUEST,
            ShopError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::Storage(_) | ShopError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ShopError::NotFound { .. } => "NOT_FOUND",
            ShopError::Validation { .. } => "VALIDATION_ERROR",
            ShopError::Rule { .. } => "BUSINESS_RULE_VIOLATION",
            ShopError::Unauthorized(_) => "UNAUTHORIZED",
            ShopError::Forbidden(_) => "FORBIDDEN",
            ShopError::Conflict(_) => "CONFLICT",
            ShopError::Storage(_) => "STORAGE_ERROR",
            ShopError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        // Backend messages can leak connection strings; keep them in the logs only.
        let message = match self {
            ShopError::Storage(_) => "A storage error occurred".to_string(),
            _ => self.to_string(),
        };
        ErrorResponse {
            error: true,
            code: self.error_code(),
            message,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ShopError::NotFound { resource, id } => Some(json!({
                "resource": resource,
                "id": id,
            })),
            ShopError::Validation { details, .. } | ShopError::Rule { details, .. } => {
                details.clone()
            }
            _ => None,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<anyhow::Error> for ShopError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ShopError>() {
            Ok(shop) => shop,
            Err(other) => ShopError::Storage(format!("{:#}", other)),
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = serde_json::Map::new();
        collect_field_errors("", &errors, &mut fields);

        ShopError::Validation {
            message: "Validation failed".to_string(),
            details: Some(json!({ "fields": fields })),
        }
    }
}

/// Flatten nested struct and list errors into `a.b` / `a[0].b` keys
fn collect_field_errors(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut serde_json::Map<String, Value>,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                out.insert(path, json!(messages));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

impl From<JsonRejection> for ShopError {
    fn from(rejection: JsonRejection) -> Self {
        ShopError::Validation {
            message: "Invalid JSON body".to_string(),
            details: Some(json!({ "reason": rejection.body_text() })),
        }
    }
}

impl From<PathRejection> for ShopError {
    fn from(rejection: PathRejection) -> Self {
        ShopError::Validation {
            message: "Invalid path parameter".to_string(),
            details: Some(json!({ "reason": rejection.body_text() })),
        }
    }
}

impl From<QueryRejection> for ShopError {
    fn from(rejection: QueryRejection) -> Self {
        ShopError::Validation {
            message: "Invalid query string".to_string(),
            details: Some(json!({ "reason": rejection.body_text() })),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ShopError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => ShopError::Unauthorized("Token has expired".to_string()),
            _ => ShopError::Unauthorized("Invalid token".to_string()),
        }
    }
}
