//! Booking manager
//!
//! Creates bookings against existing listings on behalf of an authenticated
//! caller and lists a caller's own bookings. The owner is always taken from
//! the verified identity, never from the request.

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::crypto::Identity;
use crate::db::{Booking, BookingStatus, NewBooking, SharedStore, StoreError};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Property not found: {0}")]
    ListingNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct BookingManager {
    store: SharedStore,
}

impl BookingManager {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Book a listing for `caller`. Dates are stored as given; no
    /// availability or overlap check is made.
    pub async fn create_booking(
        &self,
        request: NewBooking,
        caller: &Identity,
    ) -> Result<Booking, BookingError> {
        if self.store.get_listing(&request.property_id).await?.is_none() {
            return Err(BookingError::ListingNotFound(request.property_id));
        }

        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            property_id: request.property_id,
            user_id: caller.id.clone(),
            check_in: request.check_in,
            check_out: request.check_out,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };

        self.store.insert_booking(booking.clone()).await?;

        info!(
            booking_id = %booking.id,
            property_id = %booking.property_id,
            user_id = %booking.user_id,
            "Booking created"
        );
        Ok(booking)
    }

    /// Bookings owned by `caller`, newest first
    pub async fn list_bookings(&self, caller: &Identity) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_bookings_for_user(&caller.id).await?)
    }
}
