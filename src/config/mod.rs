//! Configuration loading and management
//!
//! Settings come from an optional YAML file named by `STOREFRONT_CONFIG`,
//! then environment variables override individual fields. Loading fails
//! instead of falling back to insecure defaults: there is no built-in JWT
//! secret.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 5000
//!   cors_origins: ["http://localhost:3000"]
//! auth:
//!   jwt_secret: "at-least-32-bytes-of-secret-material"
//!   token_ttl_hours: 24
//! storage:
//!   backend: mongodb
//!   mongodb_uri: mongodb://localhost:27017/?replicaSet=rs0
//!   mongodb_database: storefront
//! pricing:
//!   tax_rate: 0.15
//!   flat_shipping: 10.0
//!   free_shipping_threshold: 100.0
//! ```

use crate::entities::PricingPolicy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MIN_SECRET_LEN: usize = 32;

/// One year
pub const MAX_TOKEN_TTL_HOURS: i64 = 8_760;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: 24,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Mongodb,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Ok(StorageBackend::Memory),
            "mongodb" | "mongo" => Ok(StorageBackend::Mongodb),
            other => bail!("Unknown storage backend '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            mongodb_uri: None,
            mongodb_database: "storefront".to_string(),
        }
    }
}

/// First super admin, created at startup when no admin exists
#[derive(Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    #[serde(default = "default_admin_name")]
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn default_admin_name() -> String {
    "Super Admin".to_string()
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub pricing: PricingPolicy,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, raw, e))
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Failed to parse {}", path))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// File (if any) + process environment, validated
    pub fn from_env() -> Result<Self> {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable lookup
    pub fn load<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("STOREFRONT_CONFIG") {
            Some(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Override individual fields from environment variables
    pub fn apply_overrides<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("HOST") {
            self.server.host = host.trim().to_string();
        }
        if let Some(port) = var("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(origins) = var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(secret) = var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(hours) = var("JWT_EXPIRES_IN_HOURS") {
            self.auth.token_ttl_hours = parse_var("JWT_EXPIRES_IN_HOURS", &hours)?;
        }

        if let Some(backend) = var("STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(uri) = var("MONGODB_URI") {
            self.storage.mongodb_uri = Some(uri);
        }
        if let Some(database) = var("MONGODB_DATABASE") {
            self.storage.mongodb_database = database;
        }

        if let Some(rate) = var("TAX_RATE") {
            self.pricing.tax_rate = parse_var("TAX_RATE", &rate)?;
        }
        if let Some(shipping) = var("FLAT_SHIPPING") {
            self.pricing.flat_shipping = parse_var("FLAT_SHIPPING", &shipping)?;
        }
        if let Some(threshold) = var("FREE_SHIPPING_THRESHOLD") {
            self.pricing.free_shipping_threshold =
                parse_var("FREE_SHIPPING_THRESHOLD", &threshold)?;
        }

        match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => {
                self.bootstrap_admin = Some(BootstrapAdmin {
                    name: var("ADMIN_NAME").unwrap_or_else(default_admin_name),
                    email,
                    password,
                });
            }
            (None, None) => {}
            _ => bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        }

        Ok(())
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET is required");
        }
        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {} bytes long", MIN_SECRET_LEN);
        }
        if self.auth.token_ttl_hours <= 0 {
            bail!("Token lifetime must be positive");
        }
        if self.auth.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            bail!("Token lifetime must be at most {} hours", MAX_TOKEN_TTL_HOURS);
        }
        if self.server.port == 0 {
            bail!("Server port must be between 1 and 65535");
        }

        let pricing = &self.pricing;
        if pricing.tax_rate < 0.0 || pricing.tax_rate > 1.0 {
            bail!("Tax rate must be between 0 and 1");
        }
        if pricing.flat_shipping < 0.0 || pricing.free_shipping_threshold < 0.0 {
            bail!("Shipping amounts must not be negative");
        }

        if self.storage.backend == StorageBackend::Mongodb
            && self
                .storage
                .mongodb_uri
                .as_deref()
                .is_none_or(|uri| uri.trim().is_empty())
        {
            bail!("MONGODB_URI is required for the mongodb backend");
        }

        if let Some(admin) = &self.bootstrap_admin {
            if !admin.email.contains('@') {
                bail!("Bootstrap admin email is invalid");
            }
            if admin.password.len() < 8 {
                bail!("Bootstrap admin password must be at least 8 characters");
            }
        }

        Ok(())
    }

    /// `host:port` to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
