//! SGP4 propagation behind a trait seam.
//!
//! The builder only needs "lines + window in, geodetic samples out", so
//! the SGP4 dependency sits behind [`Propagator`]; tests drive the
//! builder with a closed-form analytical orbit instead.

use nalgebra::{Rotation3, Vector3};
use tracing::debug;

use geo_primitives::normalize_lon;
use track_archive::TrackBlock;

use crate::{Result, TrackBuildError};

/// Seconds between consecutive track samples.
pub const SAMPLE_SPACING_S: f64 = 60.0;

/// Adapter contract for an SGP4-style propagator.
///
/// For a window `[start_s, end_s]` the implementation emits
/// `round((end - start) / 60)` samples at evenly spaced times covering
/// both endpoints, each sample carrying time, latitude and longitude in
/// degrees (longitude normalized to (-180, 180]) in the Earth-fixed
/// frame, and geocentric radius in kilometres.
pub trait Propagator {
    fn propagate(&self, line1: &str, line2: &str, start_s: i64, end_s: i64)
        -> Result<TrackBlock>;
}

/// The production adapter over the `sgp4` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sgp4Propagator;

impl Propagator for Sgp4Propagator {
    fn propagate(
        &self,
        line1: &str,
        line2: &str,
        start_s: i64,
        end_s: i64,
    ) -> Result<TrackBlock> {
        let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| TrackBuildError::InvalidTle(format!("{:?}", e)))?;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| TrackBuildError::PropagationFailed(format!("{:?}", e)))?;
        let epoch_s = tle_archive::epoch_unix_s(&elements);

        let span = (end_s - start_s) as f64;
        let n = (span / SAMPLE_SPACING_S).round() as usize;
        debug!(norad_id = elements.norad_id, start_s, end_s, samples = n, "propagating window");

        let mut block = TrackBlock::with_capacity(n);
        for i in 0..n {
            // Evenly spaced with both endpoints included, so spacing is
            // span / (n - 1), marginally over a minute.
            let t = if n == 1 {
                start_s as f64
            } else {
                start_s as f64 + span * i as f64 / (n - 1) as f64
            };
            let minutes_since_epoch = (t - epoch_s) / 60.0;
            let prediction = constants
                .propagate(minutes_since_epoch)
                .map_err(|e| TrackBuildError::PropagationFailed(format!("{:?}", e)))?;

            let (lat_deg, lon_deg, radius_km) = teme_to_geodetic(&prediction.position, t);
            block.push(t, lat_deg as f32, lon_deg as f32, radius_km as f32);
        }
        Ok(block)
    }
}

/// Rotate a TEME position into the Earth-fixed frame and reduce it to
/// spherical geodetics: latitude, normalized longitude (degrees) and
/// geocentric radius (km).
fn teme_to_geodetic(position_km: &[f64; 3], t_unix_s: f64) -> (f64, f64, f64) {
    let gmst = gmst_rad(t_unix_s);
    let teme = Vector3::new(position_km[0], position_km[1], position_km[2]);
    let ecef = Rotation3::from_axis_angle(&Vector3::z_axis(), -gmst) * teme;

    let radius_km = ecef.norm();
    let lat_deg = (ecef.z / radius_km).asin().to_degrees();
    let lon_deg = normalize_lon(ecef.y.atan2(ecef.x).to_degrees());
    (lat_deg, lon_deg, radius_km)
}

/// Greenwich Mean Sidereal Time in radians for a Unix timestamp.
fn gmst_rad(t_unix_s: f64) -> f64 {
    // Julian date of the Unix epoch.
    const JD_UNIX_EPOCH: f64 = 2_440_587.5;
    let jd = JD_UNIX_EPOCH + t_unix_s / 86_400.0;
    let centuries = (jd - 2_451_545.0) / 36_525.0;

    let gmst_deg = 280.460_618_37
        + 360.985_647_366_29 * (jd - 2_451_545.0)
        + 0.000_387_933 * centuries * centuries
        - centuries * centuries * centuries / 38_710_000.0;

    gmst_deg.rem_euclid(360.0).to_radians()
}
