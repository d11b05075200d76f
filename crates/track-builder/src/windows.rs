//! Validity-window planning over a satellite's TLE epochs.
//!
//! Each TLE gets a window centred on its epoch: interior edges sit
//! halfway to the neighbouring epoch, capped at MAX_EXTRAP on either
//! side so a sparse catalog never asks SGP4 to extrapolate for months.
//! Edges are floored to whole minutes to share the minute grid with the
//! AIS quantization, and windows too short to hold a second sample are
//! dropped.

use tle_archive::TleRecord;
use tracing::warn;

/// Furthest we extrapolate from a TLE's epoch, in seconds. Launches and
/// deorbits are invisible in a catalog reduced to the AIS time windows,
/// so projection beyond a week is not defensible.
pub const MAX_EXTRAP_S: f64 = 7.0 * 86_400.0;

/// Shortest window worth propagating, in seconds.
const MIN_WINDOW_S: i64 = 60;

/// One TLE's validity interval, minute-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityWindow {
    pub start_s: i64,
    pub end_s: i64,
    pub line1: String,
    pub line2: String,
}

#[inline]
pub(crate) fn floor_to_minute(epoch_s: f64) -> i64 {
    60 * (epoch_s / 60.0).floor() as i64
}

/// Raw window bounds for each epoch, before line pairing: the retained
/// input index with its floored (start, end). Epochs must be ascending.
pub fn plan_window_bounds(epochs: &[f64]) -> Vec<(usize, i64, i64)> {
    let n = epochs.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = if i == 0 {
            epochs[0]
        } else {
            let halfway_back = (epochs[i - 1] + epochs[i]) / 2.0;
            halfway_back.max(epochs[i] - MAX_EXTRAP_S)
        };
        let end = if i == n - 1 {
            epochs[n - 1]
        } else {
            let halfway_forward = (epochs[i] + epochs[i + 1]) / 2.0;
            halfway_forward.min(epochs[i] + MAX_EXTRAP_S)
        };

        let start = floor_to_minute(start);
        let end = floor_to_minute(end);
        if end - start <= MIN_WINDOW_S {
            warn!(
                epoch = epochs[i],
                length_s = end - start,
                "ignoring very short validity window"
            );
            continue;
        }
        out.push((i, start, end));
    }
    out
}

/// Plan validity windows for one satellite's TLE records, sorted by
/// epoch. Output is ordered by increasing start.
pub fn plan_windows(tles: &[&TleRecord]) -> Vec<ValidityWindow> {
    let epochs: Vec<f64> = tles.iter().map(|t| t.epoch_s).collect();
    plan_window_bounds(&epochs)
        .into_iter()
        .map(|(i, start_s, end_s)| ValidityWindow {
            start_s,
            end_s,
            line1: tles[i].line1.clone(),
            line2: tles[i].line2.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DAY: f64 = 86_400.0;

    #[test]
    fn test_single_epoch_yields_nothing() {
        // One TLE gives a zero-length [t, t] window, which is dropped.
        assert!(plan_window_bounds(&[1_230_768_000.0]).is_empty());
    }

    #[test]
    fn test_close_pair_is_dropped() {
        // Epochs 100 s apart floor down to windows of at most a minute.
        assert!(plan_window_bounds(&[0.0, 100.0]).is_empty());
    }

    #[test]
    fn test_sparse_catalog_hits_extrapolation_cap() {
        // Epochs (days): 0, 0.5, 20, 20.1, 40. The [0.5, 20] gap is far
        // wider than twice the cap, so window 2 starts at 20d - 7d, not
        // at the midpoint; window 3 ends at 20.1d + 7d.
        let base = 1_230_768_000.0;
        let epochs: Vec<f64> = [0.0, 0.5, 20.0, 20.1, 40.0]
            .iter()
            .map(|d| base + d * DAY)
            .collect();

        let bounds = plan_window_bounds(&epochs);
        assert_eq!(bounds.len(), 5);

        let b = base as i64;
        let d = DAY as i64;
        assert_eq!(bounds[0], (0, b, b + d / 4));
        assert_eq!(bounds[1], (1, b + d / 4, b + d / 2 + 7 * d));
        assert_eq!(
            bounds[2],
            (2, b + 20 * d - 7 * d, b + (20 * d + (20 * d + d / 10)) / 2)
        );
        assert_eq!(
            bounds[3],
            (3, b + (20 * d + (20 * d + d / 10)) / 2, b + 20 * d + d / 10 + 7 * d)
        );
        assert_eq!(bounds[4], (4, b + 40 * d - 7 * d, b + 40 * d));
    }

    #[test]
    fn test_dense_catalog_uses_midpoints() {
        let base = 1_230_768_000.0;
        let epochs = [base, base + DAY, base + 2.0 * DAY];
        let bounds = plan_window_bounds(&epochs);
        assert_eq!(bounds.len(), 3);
        let b = base as i64;
        let d = DAY as i64;
        assert_eq!(bounds[0], (0, b, b + d / 2));
        assert_eq!(bounds[1], (1, b + d / 2, b + 3 * d / 2));
        assert_eq!(bounds[2], (2, b + 3 * d / 2, b + 2 * d));
    }

    proptest! {
        /// For epochs at least ten minutes apart (anything closer is in
        /// drop territory once edges are floored), planned windows are
        /// sorted, non-overlapping, minute-aligned, longer than a
        /// minute, and each contains its own epoch.
        #[test]
        fn prop_window_invariants(
            start in 1_000_000_000.0_f64..2_000_000_000.0,
            gaps in prop::collection::vec(600.0_f64..(30.0 * DAY), 1..40),
        ) {
            let mut epochs = vec![start];
            for g in &gaps {
                let last = *epochs.last().unwrap();
                epochs.push(last + g);
            }

            let bounds = plan_window_bounds(&epochs);
            prop_assert_eq!(bounds.len(), epochs.len());

            for (w, &(i, s, e)) in bounds.iter().enumerate() {
                prop_assert_eq!(s % 60, 0);
                prop_assert_eq!(e % 60, 0);
                prop_assert!(e - s > 60);
                prop_assert!(s as f64 <= epochs[i]);
                prop_assert!(epochs[i] <= e as f64);
                if w > 0 {
                    prop_assert!(s >= bounds[w - 1].2, "windows overlap");
                }
            }
        }
    }
}
