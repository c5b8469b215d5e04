//! Normalized listing records
//!
//! These are the shapes that reach the store. Every field is always present
//! so downstream consumers never have to guess between "missing", "null" and
//! "unknown": unknown tri-state flags are -1, unknown sizes are -1, unknown
//! contact fields are empty.

use crate::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value stored for a size that was unrecognized or implausible
pub const UNRECOGNIZED_SIZE: f64 = -1.0;

/// Tri-state flag value for "not mentioned"
pub const UNKNOWN_FLAG: i8 = -1;

/// Rent range in the post's currency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rent {
    pub min: i64,
    pub max: i64,
}

/// Room counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub rooms: u32,
    pub halls: u32,
    pub baths: u32,
}

/// Tenant gender restriction; both zero means unrestricted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderRestriction {
    pub male: u8,
    pub female: u8,
}

/// One way of reaching the landlord, in a fixed five-field shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phones: Vec<String>,
    pub line_ids: Vec<String>,
    pub line_links: Vec<String>,
    pub others: Vec<String>,
}

/// Structured view of one rental post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub address: String,
    pub rent: Rent,
    /// Floor areas in ping; [`UNRECOGNIZED_SIZE`] marks a rejected value
    pub sizes: Vec<f64>,
    pub layout: Layout,
    pub gender: GenderRestriction,
    pub pets: i8,
    pub fish: i8,
    pub cooking: i8,
    pub elevator: i8,
    pub rent_subsidy: i8,
    pub rooftop_addition: i8,
    pub scooter_parking: i8,
    pub car_parking: i8,
    pub contacts: Vec<Contact>,
    pub photos: Vec<String>,
}

/// A listing keyed by the fingerprint of the post it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub id: Fingerprint,
    #[serde(flatten)]
    pub listing: Listing,
    pub raw_text: String,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractedRecord {
    pub fn new(id: Fingerprint, listing: Listing, raw_text: &str) -> Self {
        Self {
            id,
            listing,
            raw_text: raw_text.to_string(),
            extracted_at: Utc::now(),
        }
    }
}
