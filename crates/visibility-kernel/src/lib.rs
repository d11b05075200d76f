//! Visibility Kernel
//!
//! Answers the core question at scale: which AIS pings fall inside a
//! satellite's instantaneous field-of-view footprint? The satellite's
//! minute-resolution track is interpolated to each vessel timestamp in
//! a single monotonic sweep, chunked across workers; the gap-filling
//! interpolator densifies sparse vessel tracks so long AIS silences do
//! not hide real overflights.
//!
//! Entry points: [`compute_hits`] for the full clip/dispatch/gather
//! pipeline, [`interpolate_tracks`] for AIS densification.

use thiserror::Error;

mod compositor;
mod interpolate;
mod kernel;

pub use compositor::compute_hits;
pub use interpolate::{interpolate_tracks, DEFAULT_MAX_DIST_KM, DEFAULT_MAX_DT_S};

#[derive(Error, Debug)]
pub enum VisibilityError {
    #[error("satellite track needs at least 2 samples, got {0}")]
    ShortSatelliteTrack(usize),
    #[error("satellite track times are not strictly increasing at sample {0}")]
    UnsortedSatelliteTrack(usize),
    #[error("vessel times are not sorted at row {0}")]
    UnsortedVesselSeries(usize),
    #[error("vessel columns have mismatched lengths ({0})")]
    MismatchedColumns(String),
}

pub type Result<T> = std::result::Result<T, VisibilityError>;

/// Knobs for one visibility computation. Passed by reference through
/// every call site; workers never read process-wide state.
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// Clip vessels to `time >= start_time_s`.
    pub start_time_s: Option<i64>,
    /// Clip vessels to `time <= end_time_s`.
    pub end_time_s: Option<i64>,
    /// Worker chunk count; `None` lets the compositor choose.
    pub workers: Option<usize>,
    /// Assume every satellite sees a full half-earth.
    pub half_earth: bool,
    /// Minimum elevation above the horizon, radians, for a satellite to
    /// count as seeing a vessel. Zero is the geometric tangent limit.
    pub min_horizon_elevation_rad: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            start_time_s: None,
            end_time_s: None,
            workers: None,
            half_earth: false,
            min_horizon_elevation_rad: 0.0,
        }
    }
}

/// Column-oriented AIS ping series: `(mmsi, time, lat, lon)` rows kept
/// as four parallel vectors. The producer guarantees the sort order it
/// documents; this type does not re-sort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VesselFrame {
    pub mmsi_id: Vec<u32>,
    pub time_s: Vec<i64>,
    pub lat_deg: Vec<f32>,
    pub lon_deg: Vec<f32>,
}

impl VesselFrame {
    pub fn with_capacity(n: usize) -> Self {
        VesselFrame {
            mmsi_id: Vec::with_capacity(n),
            time_s: Vec::with_capacity(n),
            lat_deg: Vec::with_capacity(n),
            lon_deg: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn push(&mut self, mmsi_id: u32, time_s: i64, lat_deg: f32, lon_deg: f32) {
        self.mmsi_id.push(mmsi_id);
        self.time_s.push(time_s);
        self.lat_deg.push(lat_deg);
        self.lon_deg.push(lon_deg);
    }

    pub(crate) fn check_columns(&self) -> Result<()> {
        let n = self.time_s.len();
        if self.mmsi_id.len() != n || self.lat_deg.len() != n || self.lon_deg.len() != n {
            return Err(VisibilityError::MismatchedColumns(format!(
                "mmsi {}, time {}, lat {}, lon {}",
                self.mmsi_id.len(),
                n,
                self.lat_deg.len(),
                self.lon_deg.len()
            )));
        }
        Ok(())
    }

    /// A copy sorted by timestamp (stable, so same-second rows keep
    /// their relative order). The intersection sweep needs time order;
    /// AIS files arrive ordered by (mmsi, time) instead.
    pub fn sorted_by_time(&self) -> VesselFrame {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.time_s[i]);

        let mut out = VesselFrame::with_capacity(self.len());
        for i in order {
            out.push(self.mmsi_id[i], self.time_s[i], self.lat_deg[i], self.lon_deg[i]);
        }
        out
    }
}
