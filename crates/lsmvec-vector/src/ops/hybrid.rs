//! Hybrid vector + spatial ranking.
//!
//! Rows are ranked by `vector_cost + weight * spatial_distance`, where
//! `vector_cost` is lower-is-better for every metric (see
//! [`Metric::as_cost`](crate::distance::Metric::as_cost)). The spatial
//! distance comes from an external [`SpatialDistance`] implementation.

use lsmvec_core::ByteReader;

use crate::error::Result;

/// Byte offset of the longitude in a stored geometry value.
pub const GEOMETRY_X_OFFSET: usize = 9;
/// Byte offset of the latitude in a stored geometry value.
pub const GEOMETRY_Y_OFFSET: usize = 17;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coordinate {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Read the point coordinates of a stored geometry value.
    ///
    /// Layout: `[srid: 4][byte order: 1][wkb type: 4][x: f64][y: f64]`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::CorruptData`](crate::error::VectorError::CorruptData)
    /// if the value is too short.
    pub fn from_geometry(geometry: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(geometry);
        reader.seek(GEOMETRY_X_OFFSET)?;
        let lon = reader.read_f64()?;
        debug_assert_eq!(reader.position(), GEOMETRY_Y_OFFSET);
        let lat = reader.read_f64()?;
        Ok(Self { lon, lat })
    }

    /// Encode as a stored point geometry with SRID 0.
    #[must_use]
    pub fn to_geometry(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(GEOMETRY_Y_OFFSET + 8);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.push(1);
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&self.lon.to_le_bytes());
        out.extend_from_slice(&self.lat.to_le_bytes());
        out
    }
}

/// Distance between two coordinates, supplied by the spatial layer.
pub trait SpatialDistance: Send + Sync {
    /// Distance from `a` to `b`.
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64;
}

/// Great-circle distance in metres.
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl SpatialDistance for Haversine {
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        let lat1 = a.lat.to_radians();
        let lat2 = b.lat.to_radians();
        let sin_dlat = ((b.lat - a.lat).to_radians() * 0.5).sin();
        let sin_dlon = ((b.lon - a.lon).to_radians() * 0.5).sin();
        let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
        EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
    }
}

/// Weighted sum of vector cost and spatial distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridCombiner {
    weight: f32,
}

impl HybridCombiner {
    /// Create a combiner. A zero weight ranks by vector cost alone.
    #[must_use]
    pub const fn new(weight: f32) -> Self {
        Self { weight }
    }

    /// The spatial weight.
    #[must_use]
    pub const fn weight(&self) -> f32 {
        self.weight
    }

    /// Combined ranking cost; lower is better.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn combine(&self, vector_cost: f32, spatial_distance: f64) -> f32 {
        vector_cost + self.weight * spatial_distance as f32
    }
}
