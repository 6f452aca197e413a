//! Health check and service descriptor.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

use super::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Number of listings in the store
    pub properties: usize,
    /// Storage backend name
    pub storage: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let properties = state.catalog.count().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        properties,
        storage: state.store.backend_name(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub auth: bool,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

const ENDPOINTS: &[(&str, &str, bool, &str)] = &[
    ("GET", "/health", false, "Service health"),
    ("GET", "/api/stats", false, "Listing statistics"),
    ("GET", "/api/properties", false, "Search listings (city, type, minPrice, maxPrice, sort, page, limit)"),
    ("GET", "/api/properties/:id", false, "Get a listing"),
    ("POST", "/api/auth/register", false, "Register a user"),
    ("POST", "/api/auth/login", false, "Log in"),
    ("GET", "/api/auth/me", true, "Current user"),
    ("GET", "/api/bookings", true, "List your bookings"),
    ("POST", "/api/bookings", true, "Create a booking"),
];

/// GET /
pub async fn root() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        endpoints: ENDPOINTS
            .iter()
            .map(|&(method, path, auth, description)| EndpointInfo {
                method,
                path,
                auth,
                description,
            })
            .collect(),
    })
}
