//! Search parameter validation.
//!
//! This module is the sole gate between raw query-string values and the
//! upstream query builder. The POI category is a closed enum, so the only
//! strings that can ever be interpolated into an outbound query are the
//! `&'static str` tokens defined here; coordinates and radius are numbers
//! checked against explicit bounds. Free-text input never gets through.

use std::str::FromStr;

use crate::error::ValidationError;

/// Radius bounds in meters.
pub const MIN_RADIUS_M: u32 = 100;
pub const MAX_RADIUS_M: u32 = 10_000;

/// Closed allowlist of searchable POI categories.
///
/// Each variant maps 1:1 to an OpenStreetMap `amenity` tag value. Adding a
/// category means adding a variant here; nothing else accepts new tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiCategory {
    Hospital,
    Pharmacy,
    Clinic,
    Restaurant,
    Fuel,
    Bank,
    School,
    Police,
    FireStation,
    Atm,
    Hotel,
    Cafe,
    FastFood,
    Parking,
    BusStation,
    Library,
}

impl PoiCategory {
    /// The amenity tag token interpolated into upstream queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            PoiCategory::Hospital => "hospital",
            PoiCategory::Pharmacy => "pharmacy",
            PoiCategory::Clinic => "clinic",
            PoiCategory::Restaurant => "restaurant",
            PoiCategory::Fuel => "fuel",
            PoiCategory::Bank => "bank",
            PoiCategory::School => "school",
            PoiCategory::Police => "police",
            PoiCategory::FireStation => "fire_station",
            PoiCategory::Atm => "atm",
            PoiCategory::Hotel => "hotel",
            PoiCategory::Cafe => "cafe",
            PoiCategory::FastFood => "fast_food",
            PoiCategory::Parking => "parking",
            PoiCategory::BusStation => "bus_station",
            PoiCategory::Library => "library",
        }
    }

    /// Capitalized label used as a fallback name for unnamed results.
    pub fn display_name(&self) -> String {
        let token = self.as_str();
        let mut chars = token.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl FromStr for PoiCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hospital" => Ok(PoiCategory::Hospital),
            "pharmacy" => Ok(PoiCategory::Pharmacy),
            "clinic" => Ok(PoiCategory::Clinic),
            "restaurant" => Ok(PoiCategory::Restaurant),
            "fuel" => Ok(PoiCategory::Fuel),
            "bank" => Ok(PoiCategory::Bank),
            "school" => Ok(PoiCategory::School),
            "police" => Ok(PoiCategory::Police),
            "fire_station" => Ok(PoiCategory::FireStation),
            "atm" => Ok(PoiCategory::Atm),
            "hotel" => Ok(PoiCategory::Hotel),
            "cafe" => Ok(PoiCategory::Cafe),
            "fast_food" => Ok(PoiCategory::FastFood),
            "parking" => Ok(PoiCategory::Parking),
            "bus_station" => Ok(PoiCategory::BusStation),
            "library" => Ok(PoiCategory::Library),
            _ => Err(ValidationError::InvalidType),
        }
    }
}

/// A fully validated search request.
///
/// Only [`validate`] constructs this type, so downstream code (the query
/// builder in particular) can rely on every field being in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchRequest {
    pub lat: f64,
    pub lon: f64,
    pub category: PoiCategory,
    pub radius_m: u32,
}

/// Validate raw search parameters.
///
/// # Rules
///
/// 1. `lat`/`lon` must be present and parse as floats (`InvalidCoordinates`)
/// 2. `lat` in [-90, 90], `lon` in [-180, 180] (`InvalidRange`)
/// 3. `poi_type`, trimmed and lower-cased, must be an allowlisted category
///    (`InvalidType`)
/// 4. `radius` must parse as an integer in [100, 10000] meters
///    (`InvalidRadius`)
pub fn validate(
    lat: Option<&str>,
    lon: Option<&str>,
    poi_type: &str,
    radius: &str,
) -> Result<SearchRequest, ValidationError> {
    let lat: f64 = lat
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ValidationError::InvalidCoordinates)?;
    let lon: f64 = lon
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ValidationError::InvalidCoordinates)?;

    // NaN fails both range comparisons below, so no separate check.
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::InvalidRange);
    }

    let category = poi_type.trim().to_lowercase().parse::<PoiCategory>()?;

    let radius_m: u32 = radius
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidRadius)?;
    if !(MIN_RADIUS_M..=MAX_RADIUS_M).contains(&radius_m) {
        return Err(ValidationError::InvalidRadius);
    }

    Ok(SearchRequest {
        lat,
        lon,
        category,
        radius_m,
    })
}
