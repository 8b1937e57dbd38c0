//! Shared handler state

use crate::core::credentials::TokenService;
use crate::entities::PricingPolicy;
use crate::storage::Repositories;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub tokens: TokenService,
    pub pricing: PricingPolicy,
}

impl AppState {
    pub fn new(repos: Repositories, tokens: TokenService, pricing: PricingPolicy) -> Self {
        Self {
            repos,
            tokens,
            pricing,
        }
    }
}
