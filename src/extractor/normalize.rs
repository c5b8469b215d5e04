//! Normalization of model output into a [`Listing`]
//!
//! The model is asked for a fixed JSON shape but routinely drifts from it:
//! placeholder strings instead of empty lists, hyphenated phone numbers,
//! implausible sizes, missing keys. This module accepts that drift where
//! the intent is clear and rejects payloads whose shape is simply wrong.
//!
//! | Input | Normalized |
//! |-------|------------|
//! | size >= ceiling | -1 |
//! | contact field missing, null, `""`, `[]`, `["unknown"]` | `[]` (name: `""`) |
//! | phone `"0912-345-678"` | `"0912345678"` |
//! | tri-state flag outside -1/0/1, or not a number | -1 |
//! | rent, layout or gender member not a whole number | 0 |

use crate::extractor::record::{
    Contact, GenderRestriction, Layout, Listing, Rent, UNKNOWN_FLAG, UNRECOGNIZED_SIZE,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Values the model uses to mean "not stated"
pub const PLACEHOLDERS: &[&str] = &["unknown", "未知"];

/// Payload is JSON but not a listing
#[derive(Debug, Error)]
#[error("Unexpected listing shape: {0}")]
pub struct NormalizeError(String);

/// Loose view of the model's output; every key is optional
///
/// Only `sizes` and `contacts` are typed. Everything else is kept as raw
/// JSON and coerced, so a stray string or float does not sink the listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawListing {
    address: Value,
    rent: Value,
    sizes: Vec<f64>,
    layout: Value,
    gender: Value,
    pets: Value,
    fish: Value,
    cooking: Value,
    elevator: Value,
    rent_subsidy: Value,
    rooftop_addition: Value,
    scooter_parking: Value,
    car_parking: Value,
    contacts: Vec<RawContact>,
    photos: Value,
}

/// Contact sub-fields are kept as raw JSON so any drift can be cleaned up
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawContact {
    name: Value,
    phones: Value,
    line_ids: Value,
    line_links: Value,
    others: Value,
}

/// Converts a parsed model response into a listing
///
/// # Arguments
///
/// * `value` - The JSON object found in the response
/// * `size_ceiling` - Sizes at or above this are replaced by -1
///
/// # Returns
///
/// * `Ok(Listing)` - Normalized listing
/// * `Err(NormalizeError)` - The payload is not an object or a field has the wrong type
pub fn normalize(value: Value, size_ceiling: f64) -> Result<Listing, NormalizeError> {
    if !value.is_object() {
        return Err(NormalizeError(format!("expected an object, got {}", kind(&value))));
    }

    let raw: RawListing =
        serde_json::from_value(value).map_err(|e| NormalizeError(e.to_string()))?;

    Ok(Listing {
        address: match raw.address {
            Value::String(address) => address.trim().to_string(),
            _ => String::new(),
        },
        rent: Rent {
            min: integer(&raw.rent["min"]).unwrap_or(0),
            max: integer(&raw.rent["max"]).unwrap_or(0),
        },
        sizes: raw
            .sizes
            .into_iter()
            .map(|size| cap_size(size, size_ceiling))
            .collect(),
        layout: Layout {
            rooms: count(&raw.layout["rooms"]),
            halls: count(&raw.layout["halls"]),
            baths: count(&raw.layout["baths"]),
        },
        gender: GenderRestriction {
            male: restricted(&raw.gender["male"]),
            female: restricted(&raw.gender["female"]),
        },
        pets: tri_state(&raw.pets),
        fish: tri_state(&raw.fish),
        cooking: tri_state(&raw.cooking),
        elevator: tri_state(&raw.elevator),
        rent_subsidy: tri_state(&raw.rent_subsidy),
        rooftop_addition: tri_state(&raw.rooftop_addition),
        scooter_parking: tri_state(&raw.scooter_parking),
        car_parking: tri_state(&raw.car_parking),
        contacts: raw.contacts.into_iter().map(normalize_contact).collect(),
        photos: match raw.photos {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(url) => Some(url),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
    })
}

fn cap_size(size: f64, ceiling: f64) -> f64 {
    if size >= ceiling || size.is_nan() {
        UNRECOGNIZED_SIZE
    } else {
        size
    }
}

/// Reads a whole number, accepting integral floats such as `1.0`
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

fn tri_state(value: &Value) -> i8 {
    match integer(value) {
        Some(-1) => -1,
        Some(0) => 0,
        Some(1) => 1,
        _ => UNKNOWN_FLAG,
    }
}

/// Room counts; anything negative or unreadable is 0
fn count(value: &Value) -> u32 {
    integer(value)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn restricted(value: &Value) -> u8 {
    match integer(value) {
        Some(1) => 1,
        _ => 0,
    }
}

fn normalize_contact(raw: RawContact) -> Contact {
    let name = match raw.name {
        Value::String(name) if !is_placeholder(&name) => name.trim().to_string(),
        _ => String::new(),
    };

    Contact {
        name,
        phones: clean_list(raw.phones)
            .into_iter()
            .map(|phone| phone.replace('-', ""))
            .collect(),
        line_ids: clean_list(raw.line_ids),
        line_links: clean_list(raw.line_links),
        others: clean_list(raw.others),
    }
}

/// Turns a contact sub-field into a list of strings
///
/// A lone placeholder or empty entry means the field is empty. A bare string
/// is treated as a one-element list.
fn clean_list(value: Value) -> Vec<String> {
    let entries: Vec<String> = match value {
        Value::Array(items) => items.into_iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    };

    match entries.as_slice() {
        [only] if only.trim().is_empty() || is_placeholder(only) => Vec::new(),
        _ => entries,
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    PLACEHOLDERS
        .iter()
        .any(|placeholder| value.eq_ignore_ascii_case(placeholder))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
