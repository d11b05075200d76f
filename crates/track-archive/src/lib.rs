//! Track Archive
//!
//! Per-satellite persisted ground tracks, addressable by NORAD id. Each
//! entry is one 4xN block (time, latitude, longitude, geocentric radius)
//! written whole; replacement is atomic from a reader's perspective via
//! write-to-temp-then-rename. Entries are sharded two directory levels
//! deep by the md5 digest of the decimal id so a full catalog does not
//! land in one flat directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub mod format;

#[derive(Error, Debug)]
pub enum TrackArchiveError {
    #[error("archive root does not exist: {0:?}")]
    MissingRoot(PathBuf),
    #[error("unknown norad id: {0}")]
    UnknownId(u32),
    #[error("corrupt track entry for norad id {norad_id}: {reason}")]
    Corrupt { norad_id: u32, reason: String },
    #[error("track block columns have mismatched lengths")]
    MismatchedColumns,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrackArchiveError>;

/// One satellite's precomputed track: four parallel columns.
///
/// Times are seconds since the Unix epoch, strictly monotonic within a
/// propagation window; adjacent windows may abut on a shared boundary
/// sample, which [`TrackArchive::get_range`] deduplicates. The time
/// column is carried as f64 (seconds near 2^30 do not survive f32);
/// geodetics stay f32. Longitudes are signed degrees in (-180, 180],
/// radii are kilometres from the Earth's centre.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackBlock {
    pub time_s: Vec<f64>,
    pub lat_deg: Vec<f32>,
    pub lon_deg: Vec<f32>,
    pub radius_km: Vec<f32>,
}

impl TrackBlock {
    pub fn with_capacity(n: usize) -> Self {
        TrackBlock {
            time_s: Vec::with_capacity(n),
            lat_deg: Vec::with_capacity(n),
            lon_deg: Vec::with_capacity(n),
            radius_km: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn push(&mut self, time_s: f64, lat_deg: f32, lon_deg: f32, radius_km: f32) {
        self.time_s.push(time_s);
        self.lat_deg.push(lat_deg);
        self.lon_deg.push(lon_deg);
        self.radius_km.push(radius_km);
    }

    /// Append all of `other`'s samples.
    pub fn extend(&mut self, other: &TrackBlock) {
        self.time_s.extend_from_slice(&other.time_s);
        self.lat_deg.extend_from_slice(&other.lat_deg);
        self.lon_deg.extend_from_slice(&other.lon_deg);
        self.radius_km.extend_from_slice(&other.radius_km);
    }

    fn check_columns(&self) -> Result<()> {
        let n = self.time_s.len();
        if self.lat_deg.len() != n || self.lon_deg.len() != n || self.radius_km.len() != n {
            return Err(TrackArchiveError::MismatchedColumns);
        }
        Ok(())
    }
}

/// Directory-tree archive of [`TrackBlock`] entries.
pub struct TrackArchive {
    root: PathBuf,
}

const TRACK_EXT: &str = "trk";

impl TrackArchive {
    /// Open an existing archive root.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(TrackArchiveError::MissingRoot(root));
        }
        Ok(TrackArchive { root })
    }

    /// Open an archive root, creating the directory if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(TrackArchive { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sharded entry path: `<root>/<hh1>/<hh2>/<norad_id>.trk`, where
    /// hh1/hh2 are the first two byte-pairs of the md5 hex digest of the
    /// decimal id.
    fn entry_path(&self, norad_id: u32) -> PathBuf {
        let digest = format!("{:x}", md5::compute(norad_id.to_string().as_bytes()));
        self.root
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(format!("{}.{}", norad_id, TRACK_EXT))
    }

    pub fn contains(&self, norad_id: u32) -> bool {
        self.entry_path(norad_id).is_file()
    }

    /// Write (or replace) a whole entry. Concurrent readers observe
    /// either the previous block or the new one, never a mix: the block
    /// is written to a temporary file in the same shard directory and
    /// renamed into place.
    pub fn put(&self, norad_id: u32, block: &TrackBlock) -> Result<()> {
        block.check_columns()?;
        let path = self.entry_path(norad_id);
        let dir = path.parent().expect("entry path always has a parent");
        fs::create_dir_all(dir)?;

        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        format::write_block(tmp.as_file(), block)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!(norad_id, samples = block.len(), path = %path.display(), "wrote track entry");
        Ok(())
    }

    /// Read a whole entry.
    pub fn get(&self, norad_id: u32) -> Result<TrackBlock> {
        let path = self.entry_path(norad_id);
        if !path.is_file() {
            return Err(TrackArchiveError::UnknownId(norad_id));
        }
        let file = fs::File::open(&path)?;
        format::read_block(file, norad_id)
    }

    /// Columns with `time in [start_s, end_s)` bounds resolved by
    /// lower-bound binary search on the time row, with duplicate
    /// timestamps dropped (first occurrence wins).
    pub fn get_range(&self, norad_id: u32, start_s: i64, end_s: i64) -> Result<TrackBlock> {
        let full = self.get(norad_id)?;
        let start = start_s as f64;
        let end = end_s as f64;
        let lo = full.time_s.partition_point(|&t| t < start);
        let hi = full.time_s.partition_point(|&t| t < end);

        let mut out = TrackBlock::with_capacity(hi.saturating_sub(lo));
        let mut last: Option<f64> = None;
        for i in lo..hi {
            let t = full.time_s[i];
            if last == Some(t) {
                continue;
            }
            last = Some(t);
            out.push(t, full.lat_deg[i], full.lon_deg[i], full.radius_km[i]);
        }
        debug!(norad_id, lo, hi, kept = out.len(), "sliced track range");
        Ok(out)
    }

    /// First and last sample times of an entry.
    pub fn timespan(&self, norad_id: u32) -> Result<(f64, f64)> {
        let block = self.get(norad_id)?;
        match (block.time_s.first(), block.time_s.last()) {
            (Some(&first), Some(&last)) => Ok((first, last)),
            _ => Err(TrackArchiveError::Corrupt {
                norad_id,
                reason: "entry holds no samples".into(),
            }),
        }
    }

    /// All NORAD ids present, ascending. Walks the two shard levels.
    pub fn list_ids(&self) -> Result<Vec<u32>> {
        let mut ids = Vec::new();
        for shard1 in fs::read_dir(&self.root)? {
            let shard1 = shard1?.path();
            if !shard1.is_dir() {
                continue;
            }
            for shard2 in fs::read_dir(&shard1)? {
                let shard2 = shard2?.path();
                if !shard2.is_dir() {
                    continue;
                }
                for entry in fs::read_dir(&shard2)? {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(TRACK_EXT) {
                        continue;
                    }
                    if let Some(id) = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(|s| s.parse::<u32>().ok())
                    {
                        ids.push(id);
                    }
                }
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block(n: usize, t0: f64) -> TrackBlock {
        let mut block = TrackBlock::with_capacity(n);
        for i in 0..n {
            block.push(
                t0 + 60.0 * i as f64,
                (i as f32 * 0.5) % 90.0,
                -179.0 + (i as f32 * 1.25) % 358.0,
                6771.0 + i as f32,
            );
        }
        block
    }

    #[test]
    fn test_put_get_roundtrip_bitwise() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();

        let block = sample_block(500, 1_230_768_000.0);
        archive.put(25544, &block).unwrap();
        let back = archive.get(25544).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_put_replaces_whole_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();

        archive.put(7, &sample_block(100, 0.0)).unwrap();
        let newer = sample_block(10, 9000.0);
        archive.put(7, &newer).unwrap();
        assert_eq!(archive.get(7).unwrap(), newer);
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();
        assert!(matches!(
            archive.get_range(42, 0, 100),
            Err(TrackArchiveError::UnknownId(42))
        ));
    }

    #[test]
    fn test_get_range_bounds_are_lower_bound_halfopen() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();

        let block = sample_block(10, 0.0); // times 0, 60, ..., 540
        archive.put(1, &block).unwrap();

        let sliced = archive.get_range(1, 60, 180).unwrap();
        assert_eq!(sliced.time_s, vec![60.0, 120.0]);

        // Bounds between samples round up to the next sample.
        let sliced = archive.get_range(1, 61, 200).unwrap();
        assert_eq!(sliced.time_s, vec![120.0, 180.0]);

        // Whole-entry slice.
        let sliced = archive.get_range(1, -100, 10_000).unwrap();
        assert_eq!(sliced.len(), 10);
    }

    #[test]
    fn test_get_range_drops_duplicate_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();

        // Two windows abutting at t=120: the boundary sample repeats.
        let mut block = TrackBlock::default();
        block.push(0.0, 1.0, 10.0, 7000.0);
        block.push(60.0, 2.0, 11.0, 7000.0);
        block.push(120.0, 3.0, 12.0, 7000.0);
        block.push(120.0, 3.5, 12.5, 7000.0);
        block.push(180.0, 4.0, 13.0, 7000.0);
        archive.put(2, &block).unwrap();

        let sliced = archive.get_range(2, 0, 1_000).unwrap();
        assert_eq!(sliced.time_s, vec![0.0, 60.0, 120.0, 180.0]);
        // First occurrence wins.
        assert_eq!(sliced.lat_deg[2], 3.0);
    }

    #[test]
    fn test_list_ids_and_timespan() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();

        archive.put(30000, &sample_block(5, 100.0)).unwrap();
        archive.put(4, &sample_block(3, 0.0)).unwrap();
        archive.put(12345, &sample_block(2, 50.0)).unwrap();

        assert_eq!(archive.list_ids().unwrap(), vec![4, 12345, 30000]);
        assert_eq!(archive.timespan(30000).unwrap(), (100.0, 340.0));
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();

        let mut block = sample_block(4, 0.0);
        block.lat_deg.pop();
        assert!(matches!(
            archive.put(9, &block),
            Err(TrackArchiveError::MismatchedColumns)
        ));
    }

    #[test]
    fn test_concurrent_readers_never_see_a_mixed_entry() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let archive = TrackArchive::create(dir.path()).unwrap();

        // Old entry is all-zeros payload, new entry all-ones; a torn
        // read would mix the two.
        let old = TrackBlock {
            time_s: (0..2000).map(|i| i as f64).collect(),
            lat_deg: vec![0.0; 2000],
            lon_deg: vec![0.0; 2000],
            radius_km: vec![7000.0; 2000],
        };
        let new = TrackBlock {
            time_s: (0..2000).map(|i| i as f64).collect(),
            lat_deg: vec![1.0; 2000],
            lon_deg: vec![1.0; 2000],
            radius_km: vec![8000.0; 2000],
        };
        archive.put(55, &old).unwrap();

        let done = AtomicBool::new(false);
        std::thread::scope(|s| {
            let archive = &archive;
            let old = &old;
            let new = &new;
            let done = &done;

            for _ in 0..4 {
                s.spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        let got = archive.get_range(55, 0, 2000).unwrap();
                        assert!(
                            got == *old || got == *new,
                            "reader observed a mixed entry"
                        );
                    }
                });
            }

            s.spawn(move || {
                for _ in 0..50 {
                    archive.put(55, new).unwrap();
                    archive.put(55, old).unwrap();
                }
                archive.put(55, new).unwrap();
                done.store(true, Ordering::Relaxed);
            });
        });

        assert_eq!(archive.get(55).unwrap(), new);
    }
}
