//! Track Builder
//!
//! Orchestrates one satellite's precomputation: fetch its TLE records,
//! plan validity windows, propagate each window into minute-spaced
//! geodetic samples, and persist the concatenated block in the track
//! archive. A window the propagator rejects is skipped with a warning;
//! a satellite with no usable windows reports "no data" and writes
//! nothing.

use thiserror::Error;
use tracing::{info, warn};

use tle_archive::TleStore;
use track_archive::{TrackArchive, TrackArchiveError, TrackBlock};

pub mod propagator;
pub mod windows;

pub use propagator::{Propagator, Sgp4Propagator};
pub use windows::{plan_window_bounds, plan_windows, ValidityWindow, MAX_EXTRAP_S};

#[derive(Error, Debug)]
pub enum TrackBuildError {
    #[error("invalid TLE: {0}")]
    InvalidTle(String),
    #[error("propagation failed: {0}")]
    PropagationFailed(String),
    #[error(transparent)]
    Archive(#[from] TrackArchiveError),
}

pub type Result<T> = std::result::Result<T, TrackBuildError>;

/// Outcome of building one satellite's track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The archive entry was (re)written.
    Written { windows: usize, samples: usize },
    /// No TLEs, no plannable windows, or every window failed.
    NoData,
}

/// Builds per-satellite track entries from a TLE store.
pub struct TrackBuilder<'a, P> {
    store: &'a TleStore,
    archive: &'a TrackArchive,
    propagator: P,
}

impl<'a, P: Propagator> TrackBuilder<'a, P> {
    pub fn new(store: &'a TleStore, archive: &'a TrackArchive, propagator: P) -> Self {
        TrackBuilder {
            store,
            archive,
            propagator,
        }
    }

    /// Build and persist the track for `norad_id`, replacing any prior
    /// entry atomically.
    pub fn build(&self, norad_id: u32) -> Result<BuildOutcome> {
        let tles = self.store.tles_for(norad_id);
        if tles.is_empty() {
            info!(norad_id, "no TLE records; nothing to build");
            return Ok(BuildOutcome::NoData);
        }

        let windows = plan_windows(&tles);
        if windows.is_empty() {
            info!(norad_id, tles = tles.len(), "no usable validity windows");
            return Ok(BuildOutcome::NoData);
        }

        let mut track = TrackBlock::default();
        let mut built = 0usize;
        for window in &windows {
            match self
                .propagator
                .propagate(&window.line1, &window.line2, window.start_s, window.end_s)
            {
                Ok(block) => {
                    track.extend(&block);
                    built += 1;
                }
                Err(e) => warn!(
                    norad_id,
                    start_s = window.start_s,
                    end_s = window.end_s,
                    error = %e,
                    "skipping window: propagation failed"
                ),
            }
        }

        if built == 0 || track.is_empty() {
            info!(norad_id, windows = windows.len(), "every window failed; no data");
            return Ok(BuildOutcome::NoData);
        }

        self.archive.put(norad_id, &track)?;
        info!(norad_id, windows = built, samples = track.len(), "track built");
        Ok(BuildOutcome::Written {
            windows: built,
            samples: track.len(),
        })
    }
}
