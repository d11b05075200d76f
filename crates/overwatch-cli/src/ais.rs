//! AIS ping CSV I/O.
//!
//! One file per calendar year with columns
//! `mmsi_id,date_time,lat,lon`, sorted by (mmsi_id, date_time);
//! `date_time` is integer seconds since the Unix epoch. A sibling file
//! named `<stem>.interp.csv` holds the gap-filled variant, and the hit
//! finder prefers it when present.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::UsageError;
use visibility_kernel::VesselFrame;

#[derive(Debug, Serialize, Deserialize)]
pub struct AisPing {
    pub mmsi_id: u32,
    pub date_time: i64,
    pub lat: f32,
    pub lon: f32,
}

/// Read one AIS CSV into a column frame.
pub fn read_ais_csv(path: &Path) -> Result<VesselFrame, UsageError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| UsageError(format!("cannot open AIS file {}: {}", path.display(), e)))?;

    let mut frame = VesselFrame::default();
    for (row, record) in reader.deserialize::<AisPing>().enumerate() {
        let ping = record.map_err(|e| {
            UsageError(format!(
                "bad AIS row {} in {}: {}",
                row + 2, // header is line 1
                path.display(),
                e
            ))
        })?;
        frame.push(ping.mmsi_id, ping.date_time, ping.lat, ping.lon);
    }
    info!(rows = frame.len(), path = %path.display(), "loaded AIS pings");
    Ok(frame)
}

/// Write a column frame as AIS CSV (same schema as the input files).
pub fn write_ais_csv(path: &Path, frame: &VesselFrame) -> Result<(), UsageError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| UsageError(format!("cannot create {}: {}", path.display(), e)))?;
    for i in 0..frame.len() {
        let ping = AisPing {
            mmsi_id: frame.mmsi_id[i],
            date_time: frame.time_s[i],
            lat: frame.lat_deg[i],
            lon: frame.lon_deg[i],
        };
        writer
            .serialize(ping)
            .map_err(|e| UsageError(format!("cannot write {}: {}", path.display(), e)))?;
    }
    writer
        .flush()
        .map_err(|e| UsageError(format!("cannot write {}: {}", path.display(), e)))?;
    info!(rows = frame.len(), path = %path.display(), "wrote AIS pings");
    Ok(())
}

/// The gap-filled sibling of an AIS file: `ais_2015.csv` ->
/// `ais_2015.interp.csv`.
pub fn interp_sibling(path: &Path) -> PathBuf {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("csv");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("ais");
    path.with_file_name(format!("{}.interp.{}", stem, ext))
}

/// Load an AIS file, preferring its interpolated sibling when present.
/// Returns the frame and whether the sibling was used.
pub fn read_preferring_interp(path: &Path) -> Result<(VesselFrame, bool), UsageError> {
    let sibling = interp_sibling(path);
    if sibling.is_file() {
        info!(path = %sibling.display(), "using interpolated sibling");
        Ok((read_ais_csv(&sibling)?, true))
    } else {
        Ok((read_ais_csv(path)?, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> VesselFrame {
        let mut v = VesselFrame::default();
        v.push(111, 1_420_070_400, 54.5, 12.25);
        v.push(111, 1_420_070_700, 54.6, 12.30);
        v.push(222, 1_420_070_500, -33.0, 151.2);
        v
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ais_2015.csv");

        write_ais_csv(&path, &sample_frame()).unwrap();
        let back = read_ais_csv(&path).unwrap();
        assert_eq!(back, sample_frame());
    }

    #[test]
    fn test_bad_schema_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(&path, "mmsi_id,date_time,lat,lon\n111,not-a-time,1.0,2.0\n").unwrap();
        assert!(read_ais_csv(&path).is_err());
    }

    #[test]
    fn test_interp_sibling_naming() {
        assert_eq!(
            interp_sibling(Path::new("/data/ais/ais_2015.csv")),
            Path::new("/data/ais/ais_2015.interp.csv")
        );
    }

    #[test]
    fn test_prefers_interp_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("ais_2016.csv");
        let sibling = dir.path().join("ais_2016.interp.csv");

        write_ais_csv(&base, &sample_frame()).unwrap();
        let (frame, used) = read_preferring_interp(&base).unwrap();
        assert!(!used);
        assert_eq!(frame.len(), 3);

        let mut denser = sample_frame();
        denser.push(222, 1_420_070_800, -33.1, 151.3);
        write_ais_csv(&sibling, &denser).unwrap();
        let (frame, used) = read_preferring_interp(&base).unwrap();
        assert!(used);
        assert_eq!(frame.len(), 4);
    }
}
