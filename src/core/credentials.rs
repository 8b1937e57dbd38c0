//! Password hashing and session tokens

use crate::core::auth::{Principal, Role};
use crate::core::error::{ShopError, ShopResult};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Sign a token for the principal
    pub fn issue(&self, principal: &Principal) -> ShopResult<String> {
        let now = Utc::now();
        let claims = Claims {
            id: principal.id,
            role: principal.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ShopError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry
    pub fn verify(&self, token: &str) -> ShopResult<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Hash a plain-text password with Argon2 and a random salt
pub fn hash_password(password: &str) -> ShopResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ShopError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a plain-text password against a stored Argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> ShopResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ShopError::Internal(format!("Invalid stored password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ShopError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
            name: "Grace".into(),
            email: "grace@example.com".into(),
            is_active: true,
        }
    }

    #[test]
    fn test_token_carries_id_and_role() {
        let tokens = TokenService::new(SECRET, 24);
        let admin = principal(Role::Admin);

        let claims = tokens.verify(&tokens.issue(&admin).unwrap()).unwrap();
        assert_eq!(claims.id, admin.id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new(SECRET, -1);
        let token = tokens.issue(&principal(Role::Customer)).unwrap();

        let err = tokens.verify(&token).unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(ref m) if m.contains("expired")));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let token = TokenService::new(SECRET, 24)
            .issue(&principal(Role::Customer))
            .unwrap();
        let other = TokenService::new("ffffffffffffffffffffffffffffffff", 24);
        assert!(matches!(
            other.verify(&token),
            Err(ShopError::Unauthorized(_))
        ));
        assert!(matches!(
            other.verify("not-a-token"),
            Err(ShopError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_internal_error() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(ShopError::Internal(_))
        ));
    }
}
