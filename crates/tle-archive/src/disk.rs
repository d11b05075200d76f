//! Columnar on-disk container for TLE records.
//!
//! Layout (little-endian): a fixed header followed by fixed-width
//! records, sorted by (epoch, element set number) at write time.
//!
//! ```text
//! magic  b"STLE"
//! u16    format version (currently 1)
//! u16    reserved
//! u64    record count
//! per record:
//!   f64      epoch, seconds since the Unix epoch
//!   u32      norad id
//!   [u8;69]  line 1, verbatim
//!   [u8;69]  line 2, verbatim
//! ```
//!
//! Lines are re-parsed on load; a record that no longer parses, or whose
//! stored epoch disagrees with the epoch encoded in its lines, fails the
//! whole load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::info;

use crate::{Result, TleArchiveError, TleRecord, TLE_LINE_LEN};

const MAGIC: &[u8; 4] = b"STLE";
const VERSION: u16 = 1;

/// Tolerance when comparing a stored epoch against the re-derived one.
const EPOCH_TOLERANCE_S: f64 = 1e-3;

fn io_err(path: &PathBuf, source: std::io::Error) -> TleArchiveError {
    TleArchiveError::Io {
        path: path.clone(),
        source,
    }
}

pub fn write_archive(path: PathBuf, records: &[TleRecord]) -> Result<()> {
    let file = File::create(&path).map_err(|e| io_err(&path, e))?;
    let mut w = BufWriter::new(file);

    let run = |w: &mut BufWriter<File>| -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_u16::<LittleEndian>(VERSION)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_u64::<LittleEndian>(records.len() as u64)?;
        for rec in records {
            w.write_f64::<LittleEndian>(rec.epoch_s)?;
            w.write_u32::<LittleEndian>(rec.norad_id)?;
            w.write_all(rec.line1.as_bytes())?;
            w.write_all(rec.line2.as_bytes())?;
        }
        w.flush()
    };
    run(&mut w).map_err(|e| io_err(&path, e))?;

    info!(records = records.len(), path = %path.display(), "wrote TLE archive");
    Ok(())
}

pub fn read_archive(path: PathBuf) -> Result<Vec<TleRecord>> {
    let file = File::open(&path).map_err(|e| io_err(&path, e))?;
    let mut r = BufReader::new(file);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(|e| io_err(&path, e))?;
    if &magic != MAGIC {
        return Err(TleArchiveError::BadMagic(path));
    }
    let version = r.read_u16::<LittleEndian>().map_err(|e| io_err(&path, e))?;
    if version != VERSION {
        return Err(TleArchiveError::UnsupportedVersion { path, version });
    }
    r.read_u16::<LittleEndian>().map_err(|e| io_err(&path, e))?;
    let count = r.read_u64::<LittleEndian>().map_err(|e| io_err(&path, e))? as usize;

    let mut records = Vec::with_capacity(count);
    let mut line1 = [0u8; TLE_LINE_LEN];
    let mut line2 = [0u8; TLE_LINE_LEN];
    for index in 0..count {
        let epoch_s = r.read_f64::<LittleEndian>().map_err(|e| io_err(&path, e))?;
        let norad_id = r.read_u32::<LittleEndian>().map_err(|e| io_err(&path, e))?;
        r.read_exact(&mut line1).map_err(|e| io_err(&path, e))?;
        r.read_exact(&mut line2).map_err(|e| io_err(&path, e))?;

        let l1 = std::str::from_utf8(&line1)
            .map_err(|_| TleArchiveError::BadLineLength { index })?;
        let l2 = std::str::from_utf8(&line2)
            .map_err(|_| TleArchiveError::BadLineLength { index })?;
        let rec = TleRecord::from_lines(index, l1, l2)?;

        if (rec.epoch_s - epoch_s).abs() > EPOCH_TOLERANCE_S {
            return Err(TleArchiveError::EpochMismatch {
                index,
                stored: epoch_s,
                encoded: rec.epoch_s,
            });
        }
        if rec.norad_id != norad_id {
            return Err(TleArchiveError::MalformedTle {
                index,
                reason: format!(
                    "stored norad id {} disagrees with encoded {}",
                    norad_id, rec.norad_id
                ),
            });
        }
        records.push(rec);
    }
    Ok(records)
}
