//! In-memory store.
//!
//! All collections live in plain vectors behind a single lock. Used for the
//! default `memory` backend (seeded from a JSON file at startup) and by tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use super::{
    Booking, BookingStore, Listing, ListingStore, Store, StoreError, StoreResult, User, UserStore,
};

#[derive(Default)]
struct MemoryData {
    listings: Vec<Listing>,
    users: Vec<User>,
    bookings: Vec<Booking>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `listings`.
    pub fn with_listings(listings: Vec<Listing>) -> StoreResult<Self> {
        let store = Self::new();
        {
            let mut data = store.data.write();
            for listing in listings {
                push_listing(&mut data, listing)?;
            }
        }
        Ok(store)
    }
}

fn push_listing(data: &mut MemoryData, listing: Listing) -> StoreResult<()> {
    listing.validate().map_err(StoreError::Invalid)?;
    if data.listings.iter().any(|l| l.id == listing.id) {
        return Err(StoreError::Conflict(format!(
            "Listing {} already exists",
            listing.id
        )));
    }
    data.listings.push(listing);
    Ok(())
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        Ok(self.data.read().listings.clone())
    }

    async fn get_listing(&self, id: &str) -> StoreResult<Option<Listing>> {
        Ok(self.data.read().listings.iter().find(|l| l.id == id).cloned())
    }

    async fn count_listings(&self) -> StoreResult<usize> {
        Ok(self.data.read().listings.len())
    }

    async fn insert_listing(&self, listing: Listing) -> StoreResult<()> {
        push_listing(&mut self.data.write(), listing)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let data = self.data.read();
        Ok(data
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.data.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, user: User) -> StoreResult<()> {
        // Check and insert under one write lock so concurrent registrations
        // with the same email cannot both succeed.
        let mut data = self.data.write();
        if data
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        data.users.push(user);
        Ok(())
    }

    async fn count_users(&self) -> StoreResult<usize> {
        Ok(self.data.read().users.len())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_booking(&self, booking: Booking) -> StoreResult<()> {
        self.data.write().bookings.push(booking);
        Ok(())
    }

    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>> {
        let data = self.data.read();
        // Reverse insertion order first so equal timestamps stay newest-first
        let mut bookings: Vec<Booking> = data
            .bookings
            .iter()
            .rev()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
