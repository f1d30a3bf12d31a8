//! Geolocation: validated coordinates, great-circle distance, and the
//! "stores near a point" query.
//!
//! Coordinates follow GeoJSON ordering, `[longitude, latitude]`. Distances are
//! computed with the haversine formula on a sphere of mean Earth radius.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Default search radius for nearby stores.
pub const DEFAULT_MAX_DISTANCE_METERS: f64 = 50_000.0;

/// Default number of nearby stores returned.
pub const DEFAULT_NEARBY_LIMIT: i64 = 10;

/// Invalid coordinates or query parameters.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GeoError {
    #[error("coordinates must be finite numbers")]
    NotFinite,
    #[error("longitude {0} is outside -180..=180")]
    LongitudeOutOfRange(f64),
    #[error("latitude {0} is outside -90..=90")]
    LatitudeOutOfRange(f64),
    #[error("search radius must be a positive number of meters, got {0}")]
    InvalidDistance(f64),
}

/// A point on the globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    longitude: f64,
    latitude: f64,
}

impl Coordinates {
    /// Validate a longitude/latitude pair.
    ///
    /// # Errors
    ///
    /// Returns `GeoError::NotFinite` for NaN or infinite values and a range
    /// error when either component is off the globe.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, GeoError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(GeoError::NotFinite);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_phi = (other.latitude - self.latitude).to_radians();
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.longitude, self.latitude].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Coordinates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [longitude, latitude] = <[f64; 2]>::deserialize(deserializer)?;
        Self::new(longitude, latitude).map_err(D::Error::custom)
    }
}

/// GeoJSON geometry type. Store locations are always points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    #[default]
    Point,
}

/// Where a store is: a point plus the human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type", default)]
    pub kind: GeometryKind,
    pub coordinates: Coordinates,
    pub address: String,
}

impl Location {
    #[must_use]
    pub fn point(coordinates: Coordinates, address: impl Into<String>) -> Self {
        Self {
            kind: GeometryKind::Point,
            coordinates,
            address: address.into(),
        }
    }
}

/// Latitude/longitude rectangle enclosing a search circle.
///
/// Used as an index-friendly prefilter before the exact distance check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

/// "Nearest stores within a radius of a point" query.
///
/// Results are ordered by ascending distance and capped at `limit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    center: Coordinates,
    max_distance_meters: f64,
    limit: i64,
}

/// Build a proximity query around `longitude`/`latitude`.
///
/// # Errors
///
/// Returns a [`GeoError`] when the coordinates are not finite or off the
/// globe, or the radius is not a positive finite number.
pub fn build_nearby_query(
    longitude: f64,
    latitude: f64,
    max_distance_meters: f64,
) -> Result<NearbyQuery, GeoError> {
    let center = Coordinates::new(longitude, latitude)?;
    if !max_distance_meters.is_finite() || max_distance_meters <= 0.0 {
        return Err(GeoError::InvalidDistance(max_distance_meters));
    }
    Ok(NearbyQuery {
        center,
        max_distance_meters,
        limit: DEFAULT_NEARBY_LIMIT,
    })
}

impl NearbyQuery {
    /// Query with the default 50 km radius.
    ///
    /// # Errors
    ///
    /// See [`build_nearby_query`].
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, GeoError> {
        build_nearby_query(longitude, latitude, DEFAULT_MAX_DISTANCE_METERS)
    }

    #[cfg(test)]
    #[must_use]
    pub const fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn center(&self) -> Coordinates {
        self.center
    }

    #[must_use]
    pub const fn max_distance_meters(&self) -> f64 {
        self.max_distance_meters
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    /// Whether `point` falls within the search radius.
    #[cfg(test)]
    #[must_use]
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.center.distance_meters(point) <= self.max_distance_meters
    }

    /// Smallest latitude/longitude rectangle containing the search circle.
    ///
    /// Near the poles or across the antimeridian the longitude span widens to
    /// the whole globe.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let angular = self.max_distance_meters / EARTH_RADIUS_METERS;
        let lat = self.center.latitude;
        let lng = self.center.longitude;
        let d_lat = angular.to_degrees();

        let min_latitude = (lat - d_lat).max(-90.0);
        let max_latitude = (lat + d_lat).min(90.0);

        let whole_globe = BoundingBox {
            min_latitude,
            max_latitude,
            min_longitude: -180.0,
            max_longitude: 180.0,
        };

        if min_latitude <= -90.0 || max_latitude >= 90.0 {
            return whole_globe;
        }

        let ratio = angular.sin() / lat.to_radians().cos();
        if ratio >= 1.0 {
            return whole_globe;
        }
        let d_lng = ratio.asin().to_degrees();
        if lng - d_lng < -180.0 || lng + d_lng > 180.0 {
            return whole_globe;
        }

        BoundingBox {
            min_latitude,
            max_latitude,
            min_longitude: lng - d_lng,
            max_longitude: lng + d_lng,
        }
    }
}
