//! Listing query engine
//!
//! Turns loosely-typed query-string parameters into a filtered, sorted and
//! paginated window over the listing collection. Malformed values never fail
//! a request: each parameter is parsed with a default and a bad value is
//! treated as absent.

use serde::Serialize;
use std::cmp::Ordering;

use crate::config::QueryConfig;
use crate::db::{Listing, PropertyType};

/// Raw listing query parameters, exactly as they arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQueryParams {
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListingQueryParams {
    /// Collect parameters from decoded query pairs. Unknown keys are
    /// ignored and a repeated key keeps its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "city" => &mut params.city,
                "type" => &mut params.property_type,
                "minPrice" => &mut params.min_price,
                "maxPrice" => &mut params.max_price,
                "sort" => &mut params.sort,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }
}

/// Sort key for query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    /// Highest rated first, unrated last
    Rating,
    /// Most recently created first
    #[default]
    Newest,
}

impl SortOrder {
    /// Unknown or missing values fall back to `Newest`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("rating") => Self::Rating,
            _ => Self::Newest,
        }
    }

    fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        match self {
            Self::PriceAsc => a.price.total_cmp(&b.price),
            Self::PriceDesc => b.price.total_cmp(&a.price),
            Self::Rating => match (a.rating, b.rating) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            Self::Newest => b.created_at.cmp(&a.created_at),
        }
    }
}

/// Parse a price bound. Anything that is not an integer is ignored.
pub fn parse_price(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

/// Parse a positive integer, falling back to `default` for missing,
/// malformed, zero or negative input.
pub fn parse_positive(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Conjunction of the active listing predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    /// Lowercased city name
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(city) = &self.city {
            if listing.location.city.to_lowercase() != *city {
                return false;
            }
        }
        if let Some(property_type) = &self.property_type {
            if listing.property_type != *property_type {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if listing.price < min as f64 {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if listing.price > max as f64 {
                return false;
            }
        }
        true
    }
}

/// A fully parsed listing query
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filter: ListingFilter,
    pub sort: SortOrder,
    pub page: usize,
    pub limit: usize,
}

impl ListingQuery {
    pub fn from_params(params: &ListingQueryParams, config: &QueryConfig) -> Self {
        let filter = ListingFilter {
            city: non_blank(params.city.as_deref()).map(str::to_lowercase),
            property_type: non_blank(params.property_type.as_deref()).map(PropertyType::parse),
            min_price: parse_price(params.min_price.as_deref()),
            max_price: parse_price(params.max_price.as_deref()),
        };

        let limit = parse_positive(params.limit.as_deref(), config.default_page_size)
            .min(config.max_page_size);

        Self {
            filter,
            sort: SortOrder::parse(params.sort.as_deref()),
            page: parse_positive(params.page.as_deref(), 1),
            limit,
        }
    }
}

/// One page of query results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    /// Size of the filtered set before pagination
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub items: Vec<Listing>,
}

/// Filter, sort (stable) and paginate `listings`.
pub fn run_query(listings: Vec<Listing>, query: &ListingQuery) -> ListingPage {
    let mut matched: Vec<Listing> = listings
        .into_iter()
        .filter(|l| query.filter.matches(l))
        .collect();

    // `sort_by` is stable, so ties keep store order
    matched.sort_by(|a, b| query.sort.compare(a, b));

    let total = matched.len();
    let limit = query.limit.max(1);
    let page = query.page.max(1);
    let offset = (page - 1).saturating_mul(limit);

    let items = matched.into_iter().skip(offset).take(limit).collect();

    ListingPage {
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
        items,
    }
}
