//! STAC (SpatioTemporal Asset Catalog) data types.
//!
//! Lightweight serde models for STAC Item Search (POST /search) responses,
//! covering the subset the pipeline consumes: bbox, datetime, collections
//! filtering, cloud cover, pagination via `links`, and asset access.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search` (STAC API - Item Search).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Pagination token (next page).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SearchParams {
    /// Create empty search params.
    pub fn new() -> Self {
        Self {
            bbox: None,
            datetime: None,
            collections: None,
            limit: None,
            token: None,
        }
    }

    /// Set the bounding box `[west, south, east, north]`.
    pub fn bbox(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.bbox = Some(vec![west, south, east, north]);
        self
    }

    /// Set datetime or datetime range (e.g. `"2015-01-01/2016-12-31"`).
    pub fn datetime(mut self, dt: &str) -> Self {
        self.datetime = Some(dt.to_string());
        self
    }

    /// Set collection filter.
    pub fn collections(mut self, cols: &[&str]) -> Self {
        self.collections = Some(cols.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Set maximum items per page.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Item>,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl ItemCollection {
    /// Find the `"next"` pagination link, if any.
    pub fn next_link(&self) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub type_: String,

    /// Unique item identifier.
    pub id: String,

    /// Bounding box `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: ItemProperties,

    pub assets: HashMap<String, Asset>,

    /// Collection this item belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl Item {
    /// Get an asset by key.
    pub fn asset(&self, key: &str) -> Option<&Asset> {
        self.assets.get(key)
    }

    /// Reported scene-level cloud cover, percent, if present.
    pub fn cloud_cover(&self) -> Option<f64> {
        self.properties.eo_cloud_cover
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension).
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform name (e.g., "landsat-8").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Asset {
    /// URL to the asset file.
    pub href: String,

    /// Media type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Roles: `["data"]`, `["thumbnail"]`, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// A STAC Link (used for pagination and related resources).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Link {
    /// Relationship: `"self"`, `"root"`, `"next"`, etc.
    pub rel: String,

    /// Target URL.
    pub href: String,

    /// HTTP method for the link (default GET, but `"next"` often uses POST).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request body for POST-based pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Whether the body should be merged with the original request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
