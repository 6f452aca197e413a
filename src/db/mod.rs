mod error;
mod memory;
mod models;
mod seeders;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::*;
pub use seeders::{load_seed_file, seed_listings, SeedReport};
pub use sqlite::SqliteStore;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{StorageBackend, StorageConfig};

/// Read/write access to the property collection.
///
/// Listings are append-only: there is no update or delete path.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// All listings, in store order
    async fn list_listings(&self) -> StoreResult<Vec<Listing>>;

    async fn get_listing(&self, id: &str) -> StoreResult<Option<Listing>>;

    async fn count_listings(&self) -> StoreResult<usize>;

    /// Append a listing. Fails with `StoreError::Conflict` on a duplicate id.
    async fn insert_listing(&self, listing: Listing) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by email, ignoring case
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<User>>;

    /// Append a user. Fails with `StoreError::Conflict` if the email is
    /// already registered under any casing.
    async fn insert_user(&self, user: User) -> StoreResult<()>;

    async fn count_users(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: Booking) -> StoreResult<()>;

    /// Bookings owned by `user_id`, newest first
    async fn list_bookings_for_user(&self, user_id: &str) -> StoreResult<Vec<Booking>>;
}

/// Everything the server needs from a backing store.
pub trait Store: ListingStore + UserStore + BookingStore {
    /// Short backend name reported by the health endpoint
    fn backend_name(&self) -> &'static str;
}

pub type SharedStore = Arc<dyn Store>;

/// Open the configured store and seed it with listings when it is empty.
pub async fn init(config: &StorageConfig) -> Result<SharedStore> {
    let store: SharedStore = match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(&config.data_dir).with_context(|| {
                format!("Failed to create data directory: {}", config.data_dir.display())
            })?;
            let db_path = config.data_dir.join("unistay.db");
            Arc::new(SqliteStore::connect(&db_path).await?)
        }
    };

    if store.count_listings().await? == 0 {
        match &config.seed_file {
            Some(path) if path.exists() => {
                let listings = load_seed_file(path)?;
                let report = seed_listings(store.as_ref(), listings).await?;
                info!(
                    inserted = report.inserted,
                    skipped = report.skipped,
                    "Seeded listings from {}",
                    path.display()
                );
            }
            Some(path) => {
                warn!("Seed file {} not found, starting with no listings", path.display());
            }
            None => info!("No seed file configured, starting with no listings"),
        }
    }

    Ok(store)
}
