mod bookings;
mod query;
mod stats;

pub use bookings::*;
pub use query::*;
pub use stats::*;

use tracing::debug;

use crate::config::QueryConfig;
use crate::db::{Listing, SharedStore, StoreResult};

/// Read side of the listing collection: search, lookup and stats.
#[derive(Clone)]
pub struct ListingCatalog {
    store: SharedStore,
    query_config: QueryConfig,
}

impl ListingCatalog {
    pub fn new(store: SharedStore, query_config: QueryConfig) -> Self {
        Self {
            store,
            query_config,
        }
    }

    pub async fn search(&self, params: &ListingQueryParams) -> StoreResult<ListingPage> {
        let query = ListingQuery::from_params(params, &self.query_config);
        let listings = self.store.list_listings().await?;
        let page = run_query(listings, &query);
        debug!(
            total = page.total,
            page = page.page,
            returned = page.items.len(),
            "Listing query"
        );
        Ok(page)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Listing>> {
        self.store.get_listing(id).await
    }

    pub async fn stats(&self) -> StoreResult<PropertyStats> {
        let listings = self.store.list_listings().await?;
        Ok(compute_stats(&listings))
    }

    pub async fn count(&self) -> StoreResult<usize> {
        self.store.count_listings().await
    }
}
