pub mod auth;
mod bookings;
pub mod error;
mod properties;
pub mod rate_limit;
mod system;
pub mod validation;

#[cfg(test)]
mod tests;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::AppState;

use self::error::ApiError;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public read endpoints
    let listing_routes = Router::new()
        .route("/stats", get(properties::get_stats))
        .route("/properties", get(properties::list_properties))
        .route("/properties/:id", get(properties::get_property));

    // Bearer token required
    let protected_routes = Router::new()
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/auth/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_routes = listing_routes
        .merge(protected_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    // Credential endpoints get the stricter tier
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    let expose_internal_errors = state.expose_internal_errors;

    let router = Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .nest("/api", api_routes.merge(auth_routes))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.server))
        .with_state(state);

    if expose_internal_errors {
        router.layer(middleware::map_response(error::expose_internal_detail))
    } else {
        router
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    cors.allow_origin(origins)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
