//! Booking models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub property_id: String,
    pub user_id: String,
    /// Check-in date, kept as supplied by the client
    pub check_in: String,
    /// Check-out date, kept as supplied by the client
    pub check_out: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Validated booking input. The owner is never part of it: it comes from
/// the caller's identity.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub property_id: String,
    pub check_in: String,
    pub check_out: String,
}

// DTOs for API

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub property_id: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booking: Booking,
}
