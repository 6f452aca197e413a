//! Property listing models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of accommodation offered by a listing.
///
/// The three well-known kinds get their own variants; anything else is kept
/// verbatim (normalized) in `Other` so new kinds never get dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyType {
    PrivateRoom,
    SharedRoom,
    Studio,
    Other(String),
}

impl PropertyType {
    /// Parse a type label. Case, spaces, hyphens and camel case are folded
    /// so `Private Room`, `private-room` and `PrivateRoom` are the same type.
    pub fn parse(raw: &str) -> Self {
        let key = normalize_type_key(raw);
        match key.as_str() {
            "private_room" => Self::PrivateRoom,
            "shared_room" => Self::SharedRoom,
            "studio" => Self::Studio,
            _ => Self::Other(key),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PrivateRoom => "private_room",
            Self::SharedRoom => "shared_room",
            Self::Studio => "studio",
            Self::Other(key) => key,
        }
    }
}

/// Fold a type label into its canonical snake_case key.
pub fn normalize_type_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;

    for c in raw.trim().chars() {
        if c == ' ' || c == '-' || c == '_' {
            if !key.is_empty() && !key.ends_with('_') {
                key.push('_');
            }
        } else {
            if c.is_uppercase() {
                if let Some(p) = prev {
                    if (p.is_lowercase() || p.is_ascii_digit()) && !key.ends_with('_') {
                        key.push('_');
                    }
                }
            }
            key.extend(c.to_lowercase());
        }
        prev = Some(c);
    }

    while key.ends_with('_') {
        key.pop();
    }
    key
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PropertyType {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for PropertyType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl Serialize for PropertyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

fn deserialize_trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub city: String,
    /// Suburb or region within the city
    #[serde(default, alias = "region", skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub price: f64,
    pub location: Location,
    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Check the field constraints a listing must satisfy before it is stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Listing id is required".to_string());
        }
        if self.title.trim().is_empty() {
            return Err(format!("Listing {} has no title", self.id));
        }
        if self.location.city.trim().is_empty() {
            return Err(format!("Listing {} has no city", self.id));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("Listing {} has an invalid price", self.id));
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(format!(
                    "Listing {} has rating {} outside 0-5",
                    self.id, rating
                ));
            }
        }
        Ok(())
    }
}

/// Seed files hold either a bare array or an object wrapping `properties`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListingSeed {
    Wrapped { properties: Vec<Listing> },
    Bare(Vec<Listing>),
}

impl ListingSeed {
    pub fn into_listings(self) -> Vec<Listing> {
        match self {
            Self::Wrapped { properties } => properties,
            Self::Bare(listings) => listings,
        }
    }
}
