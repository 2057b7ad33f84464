//! Geodata upstream response shapes and the normalized POI record.
//!
//! The Overpass interpreter returns three element kinds with different
//! coordinate layouts: nodes carry `lat`/`lon` directly, while ways and
//! relations carry a `center` object (because we request `out center`).
//! The kinds are modeled as a serde-tagged union and collapsed into the
//! single [`PoiResult`] shape at the ingestion boundary.

use serde::{Deserialize, Serialize};

use crate::validation::PoiCategory;

/// Top-level Overpass JSON response.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// One returned element, discriminated by its `type` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: PoiTags,
    },
    Way {
        id: i64,
        center: Option<Center>,
        #[serde(default)]
        tags: PoiTags,
    },
    Relation {
        id: i64,
        center: Option<Center>,
        #[serde(default)]
        tags: PoiTags,
    },
}

/// Centroid coordinates attached to non-point geometries.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

/// The subset of OSM tags the API surfaces.
#[derive(Debug, Default, Deserialize)]
pub struct PoiTags {
    pub name: Option<String>,
    pub amenity: Option<String>,
    #[serde(rename = "addr:full")]
    pub addr_full: Option<String>,
    #[serde(rename = "addr:street")]
    pub addr_street: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Option<String>,
}

impl OverpassElement {
    pub fn id(&self) -> i64 {
        match self {
            OverpassElement::Node { id, .. }
            | OverpassElement::Way { id, .. }
            | OverpassElement::Relation { id, .. } => *id,
        }
    }

    pub fn tags(&self) -> &PoiTags {
        match self {
            OverpassElement::Node { tags, .. }
            | OverpassElement::Way { tags, .. }
            | OverpassElement::Relation { tags, .. } => tags,
        }
    }

    /// Usable coordinate for this element, if it has one.
    ///
    /// Nodes always do; ways and relations only when the upstream attached
    /// a center. Elements without a coordinate are dropped from results.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            OverpassElement::Node { lat, lon, .. } => Some((*lat, *lon)),
            OverpassElement::Way { center, .. } | OverpassElement::Relation { center, .. } => {
                center.map(|c| (c.lat, c.lon))
            }
        }
    }
}

/// Normalized POI record returned to API callers.
///
/// All fields except `id`, `lat`, `lng` are defaulted when the upstream
/// element lacks the corresponding tag.
#[derive(Debug, Serialize)]
pub struct PoiResult {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub opening_hours: String,
}

impl PoiResult {
    /// Normalize one upstream element.
    ///
    /// Returns `None` when the element exposes no usable coordinate.
    ///
    /// # Defaulting
    ///
    /// - `name`: capitalized requested category when untagged
    /// - `category`: the element's amenity tag, else the requested category
    /// - `address`: `addr:full`, else `addr:street`, else empty
    /// - `phone`/`website`/`opening_hours`: empty when untagged
    pub fn from_element(element: &OverpassElement, requested: PoiCategory) -> Option<Self> {
        let (lat, lng) = element.position()?;
        let tags = element.tags();

        Some(Self {
            id: element.id(),
            name: tags
                .name
                .clone()
                .unwrap_or_else(|| requested.display_name()),
            category: tags
                .amenity
                .clone()
                .unwrap_or_else(|| requested.as_str().to_string()),
            lat,
            lng,
            address: tags
                .addr_full
                .clone()
                .or_else(|| tags.addr_street.clone())
                .unwrap_or_default(),
            phone: tags.phone.clone().unwrap_or_default(),
            website: tags.website.clone().unwrap_or_default(),
            opening_hours: tags.opening_hours.clone().unwrap_or_default(),
        })
    }
}
