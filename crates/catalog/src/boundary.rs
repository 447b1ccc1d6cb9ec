//! Administrative boundary lookup.
//!
//! Resolves a place name (e.g. `"Mato Grosso, Brazil"`) to a polygon
//! [`Region`] via the OSM Nominatim geocoder, requesting the boundary
//! geometry as GeoJSON.

use serde::Deserialize;
use tracing::info;

use vegloss_core::Region;

use crate::error::{CatalogError, Result};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const USER_AGENT: &str = concat!("vegloss/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NominatimResult {
    display_name: String,
    geojson: GeoJsonGeometry,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    #[serde(other)]
    Other,
}

/// Look up a named administrative region and return its boundary polygon.
///
/// An unknown or non-polygonal place is a boundary error; callers treat it
/// as invalid configuration rather than an upstream failure.
pub fn lookup_region(name: &str) -> Result<Region> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CatalogError::Network(e.to_string()))?;

    let results = rt.block_on(query_nominatim(name))?;

    let hit = results.into_iter().next().ok_or_else(|| CatalogError::Boundary {
        name: name.to_string(),
        reason: "no matching place found".to_string(),
    })?;

    info!(place = %hit.display_name, "resolved boundary");
    region_from_geometry(name, hit.geojson)
}

async fn query_nominatim(name: &str) -> Result<Vec<NominatimResult>> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| CatalogError::Network(format!("failed to build HTTP client: {e}")))?;

    let resp = client
        .get(NOMINATIM_URL)
        .query(&[
            ("q", name),
            ("format", "json"),
            ("polygon_geojson", "1"),
            ("limit", "1"),
        ])
        .send()
        .await
        .map_err(|e| CatalogError::Network(format!("boundary lookup request failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(CatalogError::Network(format!(
            "boundary lookup returned HTTP {}",
            resp.status()
        )));
    }

    resp.json::<Vec<NominatimResult>>()
        .await
        .map_err(|e| CatalogError::Network(format!("parsing boundary response: {e}")))
}

fn region_from_geometry(name: &str, geom: GeoJsonGeometry) -> Result<Region> {
    let rings: Vec<Vec<(f64, f64)>> = match geom {
        GeoJsonGeometry::Polygon { coordinates } => {
            // Exterior ring only; holes are rare at this resolution
            coordinates
                .into_iter()
                .take(1)
                .map(|ring| ring.into_iter().map(|[x, y]| (x, y)).collect())
                .collect()
        }
        GeoJsonGeometry::MultiPolygon { coordinates } => coordinates
            .into_iter()
            .filter_map(|poly| poly.into_iter().next())
            .map(|ring| ring.into_iter().map(|[x, y]| (x, y)).collect())
            .collect(),
        GeoJsonGeometry::Other => {
            return Err(CatalogError::Boundary {
                name: name.to_string(),
                reason: "place has no polygon geometry".to_string(),
            })
        }
    };

    Region::new(name, rings).map_err(CatalogError::Core)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_geometry_to_region() {
        let geom = GeoJsonGeometry::Polygon {
            coordinates: vec![vec![
                [10.0, 40.0],
                [11.0, 40.0],
                [11.0, 41.0],
                [10.0, 41.0],
                [10.0, 40.0],
            ]],
        };
        let region = region_from_geometry("testland", geom).unwrap();
        let (west, south, east, north) = region.bbox();
        assert_eq!((west, south, east, north), (10.0, 40.0, 11.0, 41.0));
        assert!(region.contains(10.5, 40.5));
    }

    #[test]
    fn multipolygon_uses_exterior_rings() {
        let geom = GeoJsonGeometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]],
            ],
        };
        let region = region_from_geometry("islands", geom).unwrap();
        assert_eq!(region.rings().len(), 2);
        assert!(region.contains(0.6, 0.3));
        assert!(region.contains(5.6, 5.3));
        assert!(!region.contains(3.0, 3.0));
    }

    #[test]
    fn point_geometry_is_rejected() {
        let raw = r#"{"type": "Point", "coordinates": [10.0, 40.0]}"#;
        let geom: GeoJsonGeometry = serde_json::from_str(raw).unwrap();
        assert!(region_from_geometry("somewhere", geom).is_err());
    }

    #[test]
    fn parses_nominatim_response_shape() {
        let raw = r#"[{
            "display_name": "Mato Grosso, Brazil",
            "geojson": {
                "type": "Polygon",
                "coordinates": [[[-61.6, -18.0], [-50.2, -18.0], [-50.2, -7.3], [-61.6, -7.3], [-61.6, -18.0]]]
            }
        }]"#;
        let parsed: Vec<NominatimResult> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(matches!(parsed[0].geojson, GeoJsonGeometry::Polygon { .. }));
    }
}
