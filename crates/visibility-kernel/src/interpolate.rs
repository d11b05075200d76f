//! Temporal gap-filling for vessel tracks.
//!
//! The intersection sweep interpolates the satellite, never the vessel:
//! a ship that goes dark for an hour and reappears nearby was almost
//! certainly somewhere along the line between its last two pings, and
//! without synthetic points in that gap an overflight there is missed.
//! If the ship reappears far away we cannot assume anything about the
//! path and leave the gap alone.

use geo_primitives::haversine_distance_km;
use tracing::debug;

use crate::VesselFrame;

/// Largest temporal gap, in seconds, left unfilled.
pub const DEFAULT_MAX_DT_S: i64 = 300;

/// Largest spatial gap, in kilometres, we are willing to bridge.
pub const DEFAULT_MAX_DIST_KM: f64 = 200.0;

/// Insert synthetic pings into same-vessel gaps wider than `max_dt_s`,
/// provided the endpoints are within `max_dist_km` of each other.
///
/// Input must be sorted by (mmsi, time); the output shares the schema
/// and sort order. Strictly additive: dropping the synthetic rows gives
/// back the input. A gap of `dt` seconds is split into
/// `ceil(dt / max_dt_s)` equal sub-intervals with time, latitude and
/// longitude interpolated linearly; no feasibility check is made on the
/// implied speed.
pub fn interpolate_tracks(frame: &VesselFrame, max_dt_s: i64, max_dist_km: f64) -> VesselFrame {
    let n = frame.len();
    let mut out = VesselFrame::with_capacity(n + n / 4);
    let mut inserted = 0usize;

    for i in 0..n {
        out.push(
            frame.mmsi_id[i],
            frame.time_s[i],
            frame.lat_deg[i],
            frame.lon_deg[i],
        );

        if i + 1 == n || frame.mmsi_id[i + 1] != frame.mmsi_id[i] {
            continue;
        }
        let dt = frame.time_s[i + 1] - frame.time_s[i];
        if dt <= max_dt_s {
            continue;
        }

        let lat = f64::from(frame.lat_deg[i]);
        let lon = f64::from(frame.lon_deg[i]);
        let lat2 = f64::from(frame.lat_deg[i + 1]);
        let lon2 = f64::from(frame.lon_deg[i + 1]);
        if haversine_distance_km(lon, lat, lon2, lat2) > max_dist_km {
            // Reappeared too far away; do not fabricate a path.
            continue;
        }

        let segments = (dt + max_dt_s - 1) / max_dt_s;
        let step = dt as f64 / segments as f64;
        let dlat = (lat2 - lat) / segments as f64;
        let dlon = (lon2 - lon) / segments as f64;
        for j in 1..segments {
            out.push(
                frame.mmsi_id[i],
                frame.time_s[i] + (step * j as f64) as i64,
                (lat + dlat * j as f64) as f32,
                (lon + dlon * j as f64) as f32,
            );
            inserted += 1;
        }
    }

    debug!(input = n, inserted, "interpolated vessel tracks");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 rows, 10 minutes apart, drifting (0,0) -> (10,10).
    fn sparse_track() -> VesselFrame {
        let mut v = VesselFrame::default();
        for i in 0..10 {
            v.push(42, i * 600, i as f32 * 10.0 / 9.0, i as f32 * 10.0 / 9.0);
        }
        v
    }

    #[test]
    fn test_gap_fill_counts() {
        // Each 600 s segment splits into ceil(600/150) = 4 pieces,
        // inserting 3 synthetic rows; 10 + 9 * 3 = 37 rows total.
        let out = interpolate_tracks(&sparse_track(), 150, 200.0);
        assert_eq!(out.len(), 37);

        // Timestamps strictly increase and never gap more than 150 s.
        for i in 1..out.len() {
            let dt = out.time_s[i] - out.time_s[i - 1];
            assert!(dt > 0 && dt <= 150, "gap of {} s at row {}", dt, i);
        }
    }

    #[test]
    fn test_strictly_additive() {
        let input = sparse_track();
        let out = interpolate_tracks(&input, 150, 200.0);

        // The original rows appear in the output, in order.
        let mut cursor = 0usize;
        for i in 0..input.len() {
            while cursor < out.len()
                && (out.time_s[cursor], out.lat_deg[cursor], out.lon_deg[cursor])
                    != (input.time_s[i], input.lat_deg[i], input.lon_deg[i])
            {
                cursor += 1;
            }
            assert!(cursor < out.len(), "input row {} missing from output", i);
            cursor += 1;
        }
    }

    #[test]
    fn test_idempotent_fixpoint() {
        let once = interpolate_tracks(&sparse_track(), 150, 200.0);
        let twice = interpolate_tracks(&once, 150, 200.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_small_gaps_untouched() {
        let mut v = VesselFrame::default();
        v.push(7, 0, 0.0, 0.0);
        v.push(7, 200, 0.1, 0.1);
        v.push(7, 400, 0.2, 0.2);
        assert_eq!(interpolate_tracks(&v, 300, 200.0), v);
    }

    #[test]
    fn test_no_fill_across_vessels() {
        let mut v = VesselFrame::default();
        v.push(1, 0, 0.0, 0.0);
        v.push(2, 10_000, 0.1, 0.1);
        assert_eq!(interpolate_tracks(&v, 300, 200.0), v);
    }

    #[test]
    fn test_no_fill_over_spatial_discontinuity() {
        // ~5500 km apart: the ship cannot be assumed to have sailed a
        // straight line; leave the gap.
        let mut v = VesselFrame::default();
        v.push(1, 0, 0.0, 0.0);
        v.push(1, 10_000, 0.0, 50.0);
        assert_eq!(interpolate_tracks(&v, 300, 200.0), v);
    }

    #[test]
    fn test_uneven_gap_rounds_segments_up() {
        // dt = 700, max_dt = 300 -> 3 segments, 2 inserted rows at
        // +233 and +466 seconds.
        let mut v = VesselFrame::default();
        v.push(9, 0, 0.0, 0.0);
        v.push(9, 700, 0.3, 0.0);
        let out = interpolate_tracks(&v, 300, 200.0);
        assert_eq!(out.time_s, vec![0, 233, 466, 700]);
        assert_eq!(out.mmsi_id, vec![9, 9, 9, 9]);
    }
}
