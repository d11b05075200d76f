//! Clip, dispatch, gather.
//!
//! The compositor owns everything around the sweep: input-shape
//! validation, normalization to the kernel's numeric contract, the time
//! clip, worker-chunk dispatch, and materialising the hit frame in
//! input order.

use rayon::prelude::*;
use tracing::debug;

use track_archive::TrackBlock;

use crate::kernel::{self, SatColumns};
use crate::{KernelConfig, Result, VesselFrame, VisibilityError};

/// Default chunk count, doubled while the vessel count splits evenly.
fn choose_workers(requested: Option<usize>, n: usize) -> usize {
    match requested {
        Some(w) => w.max(1),
        None => {
            let mut w = 4;
            while w < 32 && n % (2 * w) == 0 {
                w *= 2;
            }
            w
        }
    }
}

/// Every ping of `vessels` that lies inside `sat`'s field-of-view
/// footprint at its own timestamp.
///
/// `sat` must hold at least two samples with strictly increasing times;
/// `vessels` must be sorted by time (AIS deliveries ordered by
/// (mmsi, time) need [`VesselFrame::sorted_by_time`] first). The hit
/// frame preserves input order and columns. Identical inputs and
/// worker count give identical output; the hit set itself is invariant
/// across worker counts.
pub fn compute_hits(
    sat: &TrackBlock,
    vessels: &VesselFrame,
    cfg: &KernelConfig,
) -> Result<VesselFrame> {
    let m = sat.len();
    if m < 2 {
        return Err(VisibilityError::ShortSatelliteTrack(m));
    }
    vessels.check_columns()?;

    // Normalise the satellite columns: whole seconds, f64 geodetics.
    let mut sat_time = Vec::with_capacity(m);
    for (i, &t) in sat.time_s.iter().enumerate() {
        let t = t as i64;
        if i > 0 && t <= sat_time[i - 1] {
            return Err(VisibilityError::UnsortedSatelliteTrack(i));
        }
        sat_time.push(t);
    }
    let sat_lat: Vec<f64> = sat.lat_deg.iter().map(|&v| f64::from(v)).collect();
    let sat_lon: Vec<f64> = sat.lon_deg.iter().map(|&v| f64::from(v)).collect();
    let sat_alt: Vec<f64> = if cfg.half_earth {
        vec![f64::INFINITY; m]
    } else {
        sat.radius_km.iter().map(|&v| f64::from(v)).collect()
    };

    for i in 1..vessels.len() {
        if vessels.time_s[i] < vessels.time_s[i - 1] {
            return Err(VisibilityError::UnsortedVesselSeries(i));
        }
    }

    // Clip the vessel series to [start, end], carrying mmsi through by
    // keeping the clip offset.
    let vt = &vessels.time_s;
    let lo = match cfg.start_time_s {
        Some(start) => vt.partition_point(|&t| t < start),
        None => 0,
    };
    let hi = match cfg.end_time_s {
        Some(end) => vt.partition_point(|&t| t <= end),
        None => vt.len(),
    };
    if lo >= hi {
        return Ok(VesselFrame::default());
    }
    let n = hi - lo;
    debug!(clipped_from = vessels.len(), clipped_to = n, "time clip");

    let v_time = &vessels.time_s[lo..hi];
    let v_lat: Vec<f64> = vessels.lat_deg[lo..hi].iter().map(|&v| f64::from(v)).collect();
    let v_lon: Vec<f64> = vessels.lon_deg[lo..hi].iter().map(|&v| f64::from(v)).collect();

    let sat_cols = SatColumns {
        time: &sat_time,
        lat: &sat_lat,
        lon: &sat_lon,
        alt: &sat_alt,
    };

    let workers = choose_workers(cfg.workers, n);
    let chunk = n / workers;
    let mut mask = vec![false; n];
    let elevation = cfg.min_horizon_elevation_rad;

    if workers <= 1 || chunk == 0 {
        kernel::sweep(sat_cols, v_time, &v_lat, &v_lon, elevation, &mut mask);
    } else {
        // Equal-size contiguous chunks; each worker re-seeds its own
        // satellite bracket and writes a disjoint mask slice. The tail
        // remainder runs serial after the join.
        let total = chunk * workers;
        debug!(workers, chunk, remainder = n - total, "dispatching chunks");
        let (head, tail) = mask.split_at_mut(total);
        head.par_chunks_mut(chunk).enumerate().for_each(|(ci, out)| {
            let base = ci * chunk;
            kernel::sweep(
                sat_cols,
                &v_time[base..base + out.len()],
                &v_lat[base..base + out.len()],
                &v_lon[base..base + out.len()],
                elevation,
                out,
            );
        });
        if total < n {
            kernel::sweep(
                sat_cols,
                &v_time[total..],
                &v_lat[total..],
                &v_lon[total..],
                elevation,
                tail,
            );
        }
    }

    let count = mask.iter().filter(|&&h| h).count();
    let mut hits = VesselFrame::with_capacity(count);
    for (i, &hit) in mask.iter().enumerate() {
        if hit {
            let j = lo + i;
            hits.push(
                vessels.mmsi_id[j],
                vessels.time_s[j],
                vessels.lat_deg[j],
                vessels.lon_deg[j],
            );
        }
    }
    Ok(hits)
}
