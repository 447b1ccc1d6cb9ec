//! Analysis region geometry.
//!
//! A [`Region`] is an immutable polygon or multipolygon in geographic
//! (lon/lat) coordinates, resolved once from an administrative-boundary
//! lookup and then shared read-only by every pipeline stage. It bounds the
//! imagery queries and clips the composites.

use crate::error::{Error, Result};

/// A closed ring of (lon, lat) vertices.
///
/// The first and last vertex need not repeat; the ring is implicitly closed.
pub type Ring = Vec<(f64, f64)>;

/// Polygon/multipolygon analysis area.
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    /// Outer rings of each polygon part. Holes are not modelled; the
    /// boundary sources this system consumes return simple outlines.
    rings: Vec<Ring>,
}

impl Region {
    /// Create a region from polygon rings.
    ///
    /// Rejects empty geometry and degenerate rings (fewer than 3 vertices).
    pub fn new(name: impl Into<String>, rings: Vec<Ring>) -> Result<Self> {
        let name = name.into();
        if rings.is_empty() || rings.iter().all(|r| r.is_empty()) {
            return Err(Error::EmptyRegion(name));
        }
        for ring in &rings {
            if ring.len() < 3 {
                return Err(Error::invalid_parameter(
                    "region",
                    &name,
                    format!("degenerate ring with {} vertices", ring.len()),
                ));
            }
        }
        Ok(Self { name, rings })
    }

    /// Convenience constructor for a rectangular region.
    pub fn from_bbox(
        name: impl Into<String>,
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    ) -> Result<Self> {
        Self::new(
            name,
            vec![vec![
                (west, south),
                (east, south),
                (east, north),
                (west, north),
            ]],
        )
    }

    /// Region identifier (administrative-boundary name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem-friendly slug derived from the name.
    pub fn slug(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect::<String>()
            .split('_')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Polygon outer rings.
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Bounding box (west, south, east, north).
    pub fn bbox(&self) -> (f64, f64, f64, f64) {
        let mut west = f64::INFINITY;
        let mut south = f64::INFINITY;
        let mut east = f64::NEG_INFINITY;
        let mut north = f64::NEG_INFINITY;

        for ring in &self.rings {
            for &(x, y) in ring {
                west = west.min(x);
                east = east.max(x);
                south = south.min(y);
                north = north.max(y);
            }
        }

        (west, south, east, north)
    }

    /// Point-in-region test by even-odd ray casting over all rings.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let mut inside = false;

        for ring in &self.rings {
            let n = ring.len();
            let mut j = n - 1;
            for i in 0..n {
                let (xi, yi) = ring[i];
                let (xj, yj) = ring[j];
                if (yi > y) != (yj > y) {
                    let x_cross = xi + (y - yi) / (yj - yi) * (xj - xi);
                    if x < x_cross {
                        inside = !inside;
                    }
                }
                j = i;
            }
        }

        inside
    }
}
