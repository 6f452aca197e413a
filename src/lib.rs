pub mod api;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod db;
pub mod engine;
pub mod startup;

use config::Config;
use std::sync::Arc;
use std::time::Instant;

use crate::api::rate_limit::RateLimiter;
use crate::crypto::TokenService;
use crate::db::SharedStore;
use crate::engine::{BookingManager, ListingCatalog};

pub struct AppState {
    pub config: Config,
    pub store: SharedStore,
    pub catalog: ListingCatalog,
    pub bookings: BookingManager,
    pub tokens: TokenService,
    pub rate_limiter: Arc<RateLimiter>,
    /// Include internal error detail in 500 responses (development only)
    pub expose_internal_errors: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, store: SharedStore) -> Self {
        let catalog = ListingCatalog::new(store.clone(), config.query.clone());
        let bookings = BookingManager::new(store.clone());
        let tokens = TokenService::from_config(&config.auth);
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let expose_internal_errors = config.server.environment.is_development();
        Self {
            config,
            store,
            catalog,
            bookings,
            tokens,
            rate_limiter,
            expose_internal_errors,
            started_at: Instant::now(),
        }
    }
}
