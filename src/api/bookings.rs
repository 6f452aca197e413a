use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::crypto::Identity;
use crate::db::{Booking, BookingResponse, CreateBookingRequest};
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_booking_request;

/// POST /api/bookings
///
/// The owner is the authenticated caller; any `userId` in the body is ignored.
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let Json(req) = payload?;
    let new_booking = validate_booking_request(&req)?;

    let booking = state.bookings.create_booking(new_booking, &identity).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse { booking })))
}

/// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(state.bookings.list_bookings(&identity).await?))
}
