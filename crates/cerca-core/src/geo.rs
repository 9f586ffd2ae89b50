//! Deterministic location obfuscation ("near you" without the exact spot).
//!
//! The offset for an entity is derived only from its key, so repeated
//! queries always return the same fuzzed point and cannot be averaged back
//! to the true location. See [`crate::hashing`] for the limits of this.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::hashing::stable_hash64_pair;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Largest prime below 2^31, used to fold hash words into [0, 1).
const FOLD_PRIME: u64 = 2_147_483_647;

/// Guards the longitude scaling near the poles.
const MIN_COS_LATITUDE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build from nullable columns; `None` unless both are present.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(Self::new(lat, lng))
            }
            _ => None,
        }
    }
}

fn unit_fraction(word: u64) -> f64 {
    (word % FOLD_PRIME) as f64 / FOLD_PRIME as f64
}

fn wrap_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 { 180.0 } else { wrapped }
}

/// Offset `(latitude, longitude)` by a stable pseudo-random vector of at most
/// `radius_m` meters derived from `entity_key`.
///
/// Points are uniform over the disc area (`radius * sqrt(r)`), not uniform
/// over the radius. Returns `None` when either coordinate is missing.
pub fn obfuscate(
    latitude: Option<f64>,
    longitude: Option<f64>,
    entity_key: &str,
    radius_m: f64,
) -> Option<Coordinates> {
    let origin = Coordinates::from_parts(latitude, longitude)?;
    Some(obfuscate_point(origin, entity_key, radius_m))
}

/// Non-nullable form of [`obfuscate`].
pub fn obfuscate_point(origin: Coordinates, entity_key: &str, radius_m: f64) -> Coordinates {
    let radius_m = if radius_m.is_finite() {
        radius_m.max(0.0)
    } else {
        0.0
    };

    let (angle_word, radial_word) = stable_hash64_pair(entity_key);
    let theta = TAU * unit_fraction(angle_word);
    let distance = radius_m * unit_fraction(radial_word).sqrt();

    let north_m = distance * theta.cos();
    let east_m = distance * theta.sin();

    let cos_lat = origin.latitude.to_radians().cos().max(MIN_COS_LATITUDE);
    let d_lat = (north_m / EARTH_RADIUS_M).to_degrees();
    let d_lng = (east_m / (EARTH_RADIUS_M * cos_lat)).to_degrees();

    Coordinates {
        latitude: (origin.latitude + d_lat).clamp(-90.0, 90.0),
        longitude: wrap_longitude(origin.longitude + d_lng),
    }
}

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    haversine_m(a, b) / 1000.0
}
