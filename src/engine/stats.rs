//! Listing statistics

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::db::Listing;

/// Summary statistics over the whole listing collection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyStats {
    pub total_properties: usize,
    /// Number of distinct cities
    pub cities: usize,
    /// Distinct cities in first-seen order
    pub cities_list: Vec<String>,
    /// Mean price rounded to the nearest integer, 0 when there are no listings
    pub average_price: i64,
    /// Listing count per normalized type key
    pub property_types: BTreeMap<String, usize>,
}

/// Compute stats for `listings`.
pub fn compute_stats(listings: &[Listing]) -> PropertyStats {
    let mut seen = HashSet::new();
    let mut cities_list = Vec::new();
    let mut property_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut price_sum = 0.0_f64;

    for listing in listings {
        let city = listing.location.city.as_str();
        if seen.insert(city) {
            cities_list.push(city.to_string());
        }
        *property_types
            .entry(listing.property_type.as_str().to_string())
            .or_default() += 1;
        price_sum += listing.price;
    }

    let average_price = if listings.is_empty() {
        0
    } else {
        (price_sum / listings.len() as f64).round() as i64
    };

    PropertyStats {
        total_properties: listings.len(),
        cities: cities_list.len(),
        cities_list,
        average_price,
        property_types,
    }
}
