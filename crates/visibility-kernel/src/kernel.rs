//! The hot inner sweep.
//!
//! One pass over a vessel chunk, carrying a bracket index into the
//! satellite series so that `sat_time[k-1] <= v_time[i] < sat_time[k]`.
//! Both series are sorted, so the bracket only ever advances; vessel
//! timestamps repeat often (many ships ping the same second), so the
//! interpolated satellite state and FOV half-angle are cached until the
//! bracket or the vessel timestamp moves.
//!
//! All arithmetic is f64; angles radians; distances kilometres.

use geo_primitives::{fov_half_angle, haversine_angle, EARTH_RADIUS_KM};

/// Read-only satellite columns shared by every worker.
#[derive(Clone, Copy)]
pub(crate) struct SatColumns<'a> {
    pub time: &'a [i64],
    pub lat: &'a [f64],
    pub lon: &'a [f64],
    pub alt: &'a [f64],
}

/// Sweep one vessel chunk, writing the verdicts into `hits` (same
/// length as the vessel slices, pre-initialised to false).
///
/// Pings before the satellite window stay false; once the bracket runs
/// off the end of the satellite series every remaining ping is past it
/// and the sweep stops. A ping at exactly the last satellite sample is
/// past the end by the bracket convention.
pub(crate) fn sweep(
    sat: SatColumns<'_>,
    v_time: &[i64],
    v_lat: &[f64],
    v_lon: &[f64],
    min_elevation_rad: f64,
    hits: &mut [bool],
) {
    debug_assert_eq!(v_time.len(), hits.len());
    let m = sat.time.len();
    debug_assert!(m >= 2);

    let mut k = 1usize;
    let mut left = sat.time[0];
    let mut right = sat.time[1];
    let mut dirty = true;

    let mut sat_interp_lat = 0.0f64;
    let mut sat_interp_lon = 0.0f64;
    let mut fov_max_angle = 0.0f64;

    for i in 0..v_time.len() {
        let vtime = v_time[i];

        // Lead-in: this chunk may start before the satellite window.
        if vtime < left {
            continue;
        }
        while vtime >= right {
            k += 1;
            if k == m {
                // This ping and everything after it is past the last
                // satellite sample.
                return;
            }
            left = right;
            right = sat.time[k];
            dirty = true;
        }
        // Bracket invariant: left <= vtime < right.

        if i > 0 && v_time[i - 1] != vtime {
            dirty = true;
        }

        if dirty {
            dirty = false;
            let span = (right - left) as f64;
            let alpha = (vtime - left) as f64 / span;
            let beta = 1.0 - alpha;

            sat_interp_lat = beta * sat.lat[k - 1] + alpha * sat.lat[k];
            sat_interp_lon = beta * sat.lon[k - 1] + alpha * sat.lon[k];
            // An infinite altitude is the half-earth sentinel; it must
            // not enter the lerp (0 * inf is NaN at the bracket edges).
            let mut sat_interp_alt = if sat.alt[k - 1].is_infinite() || sat.alt[k].is_infinite() {
                f64::INFINITY
            } else {
                beta * sat.alt[k - 1] + alpha * sat.alt[k]
            };

            // Degenerate orbits interpolate below the surface; clamp.
            if sat_interp_alt < EARTH_RADIUS_KM {
                sat_interp_alt = EARTH_RADIUS_KM;
            }
            fov_max_angle = fov_half_angle(sat_interp_alt, min_elevation_rad);
        }

        let angle = haversine_angle(sat_interp_lon, sat_interp_lat, v_lon[i], v_lat[i]);
        hits[i] = angle <= fov_max_angle;
    }
}
