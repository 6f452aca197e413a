//! Listing seeders
//!
//! Loads listings from a JSON seed file and appends them to a store. Used at
//! startup when the store is empty and by the `seed` CLI command.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use super::{Listing, ListingSeed, ListingStore, StoreError, StoreResult};

/// Outcome of a seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    /// Listings whose id was already present
    pub skipped: usize,
}

/// Read and validate listings from a seed file.
///
/// The file is either a JSON array of listings or an object with a
/// `properties` array. Any invalid listing fails the whole load.
pub fn load_seed_file(path: &Path) -> Result<Vec<Listing>> {
    info!("Loading listings from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    let seed: ListingSeed = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file: {}", path.display()))?;

    let listings = seed.into_listings();
    for listing in &listings {
        listing
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid listing in {}: {}", path.display(), e))?;
    }
    Ok(listings)
}

/// Append listings to the store, skipping ids that already exist.
pub async fn seed_listings<S>(store: &S, listings: Vec<Listing>) -> StoreResult<SeedReport>
where
    S: ListingStore + ?Sized,
{
    let mut report = SeedReport::default();

    for listing in listings {
        let id = listing.id.clone();
        match store.insert_listing(listing).await {
            Ok(()) => report.inserted += 1,
            Err(StoreError::Conflict(_)) => {
                warn!(listing_id = %id, "Skipping listing with duplicate id");
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}
