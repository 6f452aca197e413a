use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::db::Listing;
use crate::engine::{ListingPage, ListingQueryParams, PropertyStats};
use crate::AppState;

use super::error::ApiError;

/// GET /api/properties
///
/// Every parameter is optional; malformed values are ignored.
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ListingPage>, ApiError> {
    let params = ListingQueryParams::from_pairs(pairs);
    let page = state.catalog.search(&params).await?;
    Ok(Json(page))
}

/// GET /api/properties/:id
pub async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Listing>, ApiError> {
    state
        .catalog
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Property not found: {}", id)))
}

/// GET /api/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<PropertyStats>, ApiError> {
    Ok(Json(state.catalog.stats().await?))
}
