//! Geodesic Primitives
//!
//! Haversine central angles, longitude normalization, and the satellite
//! field-of-view half-angle shared by the track builder and the
//! visibility kernel.
//!
//! Conventions: latitudes and longitudes in degrees at the API surface,
//! angles in radians internally and on return, distances in kilometres.

use std::f64::consts::{FRAC_PI_2, PI};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine central angle between two points, in radians.
///
/// Inputs are decimal degrees. The returned value is the angle subtended
/// at the Earth's centre, so the great-circle distance is
/// `angle * EARTH_RADIUS_KM`.
#[inline]
pub fn haversine_angle(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let dlon = (lon2 - lon1).to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance between two points, in kilometres.
#[inline]
pub fn haversine_distance_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    haversine_angle(lon1, lat1, lon2, lat2) * EARTH_RADIUS_KM
}

/// Normalize a longitude in degrees to the interval (-180, 180].
#[inline]
pub fn normalize_lon(lon_deg: f64) -> f64 {
    let wrapped = (lon_deg + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Half-angle of the spherical cap a satellite can see, in radians.
///
/// `radius_km` is the satellite's geocentric radius. `min_elevation_rad`
/// is the minimum elevation above the horizon at which the satellite
/// counts as visible; zero means the geometric tangent limit.
///
/// An infinite radius encodes the half-earth assumption and yields pi/2.
#[inline]
pub fn fov_half_angle(radius_km: f64, min_elevation_rad: f64) -> f64 {
    if radius_km.is_infinite() {
        return FRAC_PI_2;
    }
    let r = radius_km.max(EARTH_RADIUS_KM);
    if min_elevation_rad < 1e-6 {
        // tangent limit: horizon ray grazes the sphere
        (EARTH_RADIUS_KM / r).acos()
    } else {
        FRAC_PI_2
            - min_elevation_rad
            - (EARTH_RADIUS_KM / r * (min_elevation_rad + FRAC_PI_2).sin()).asin()
    }
}

/// Convert a minimum horizon elevation given in degrees to radians.
#[inline]
pub fn horizon_elevation_rad(elevation_deg: f64) -> f64 {
    elevation_deg / 180.0 * PI
}
