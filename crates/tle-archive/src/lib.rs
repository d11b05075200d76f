//! TLE Archive
//!
//! Read-mostly archive of two-line element sets, keyed by epoch with a
//! secondary index on NORAD id. Records are immutable once ingested; the
//! query surface is a range scan by epoch and an equality scan by id.
//!
//! The on-disk container is a little-endian columnar file with the two
//! 69-byte TLE lines carried verbatim; see [`disk`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod disk;
pub mod ingest;

/// Length of a standard TLE line in bytes.
pub const TLE_LINE_LEN: usize = 69;

#[derive(Error, Debug)]
pub enum TleArchiveError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a TLE archive file: {0:?}")]
    BadMagic(PathBuf),
    #[error("unsupported TLE archive version {version} in {path:?}")]
    UnsupportedVersion { path: PathBuf, version: u16 },
    #[error("malformed TLE at record {index}: {reason}")]
    MalformedTle { index: usize, reason: String },
    #[error("TLE line is not {TLE_LINE_LEN} ASCII bytes at record {index}")]
    BadLineLength { index: usize },
    #[error("stored epoch {stored} disagrees with encoded epoch {encoded} at record {index}")]
    EpochMismatch { index: usize, stored: f64, encoded: f64 },
}

pub type Result<T> = std::result::Result<T, TleArchiveError>;

/// One two-line element set with its derived sort keys.
///
/// `epoch_s` is seconds since the Unix epoch, derived from the epoch
/// encoded in the lines. `element_set_number` breaks epoch ties the way
/// the upstream catalog does.
#[derive(Debug, Clone, PartialEq)]
pub struct TleRecord {
    pub epoch_s: f64,
    pub norad_id: u32,
    pub element_set_number: u32,
    pub line1: String,
    pub line2: String,
}

impl TleRecord {
    /// Parse a line pair, deriving epoch, NORAD id and element set number.
    pub fn from_lines(index: usize, line1: &str, line2: &str) -> Result<Self> {
        if line1.len() != TLE_LINE_LEN || line2.len() != TLE_LINE_LEN {
            return Err(TleArchiveError::BadLineLength { index });
        }
        let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| TleArchiveError::MalformedTle {
                index,
                reason: format!("{:?}", e),
            })?;
        Ok(TleRecord {
            epoch_s: epoch_unix_s(&elements),
            norad_id: elements.norad_id as u32,
            element_set_number: elements.element_set_number as u32,
            line1: line1.to_string(),
            line2: line2.to_string(),
        })
    }
}

/// Seconds since the Unix epoch for the epoch encoded in an element set.
pub fn epoch_unix_s(elements: &sgp4::Elements) -> f64 {
    let dt = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

/// In-memory TLE store: records sorted by (epoch, element set number)
/// with a secondary index on NORAD id.
#[derive(Debug, Clone, Default)]
pub struct TleStore {
    records: Vec<TleRecord>,
    by_norad: BTreeMap<u32, Vec<usize>>,
}

impl TleStore {
    /// Build a store from records; sorts and indexes.
    pub fn from_records(mut records: Vec<TleRecord>) -> Self {
        records.sort_by(|a, b| {
            a.epoch_s
                .total_cmp(&b.epoch_s)
                .then(a.element_set_number.cmp(&b.element_set_number))
        });
        let mut by_norad: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, rec) in records.iter().enumerate() {
            by_norad.entry(rec.norad_id).or_default().push(i);
        }
        TleStore { records, by_norad }
    }

    /// Load a store from the columnar archive file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let records = disk::read_archive(path.into())?;
        Ok(Self::from_records(records))
    }

    /// Persist the store to the columnar archive file at `path`.
    pub fn save(&self, path: impl Into<PathBuf>) -> Result<()> {
        disk::write_archive(path.into(), &self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All NORAD ids present, ascending.
    pub fn norad_ids(&self) -> Vec<u32> {
        self.by_norad.keys().copied().collect()
    }

    /// All records for one satellite, sorted by (epoch, element set
    /// number). Unknown ids yield an empty sequence, not an error.
    pub fn tles_for(&self, norad_id: u32) -> Vec<&TleRecord> {
        match self.by_norad.get(&norad_id) {
            Some(indices) => indices.iter().map(|&i| &self.records[i]).collect(),
            None => Vec::new(),
        }
    }

    /// A store restricted to epochs in `[start_s, end_s]`.
    pub fn clip(&self, start_s: f64, end_s: f64) -> TleStore {
        let clipped = self
            .records
            .iter()
            .filter(|r| r.epoch_s >= start_s && r.epoch_s <= end_s)
            .cloned()
            .collect();
        TleStore::from_records(clipped)
    }

    /// Epoch range scan: records with `start_s <= epoch <= end_s`.
    pub fn epoch_range(&self, start_s: f64, end_s: f64) -> impl Iterator<Item = &TleRecord> {
        let lo = self.records.partition_point(|r| r.epoch_s < start_s);
        self.records[lo..]
            .iter()
            .take_while(move |r| r.epoch_s <= end_s)
    }

    pub fn records(&self) -> &[TleRecord] {
        &self.records
    }
}
