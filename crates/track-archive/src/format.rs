//! Binary container for one track entry.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic  b"S9TK"
//! u16    format version (currently 1)
//! u16    flags
//! u64    sample count N
//! f64*N  time, seconds since the Unix epoch
//! f32*N  latitude, degrees
//! f32*N  longitude, degrees
//! f32*N  geocentric radius, kilometres
//! ```
//!
//! The flags word records the conventions the columns were written
//! under, so a reader never has to guess: signed longitudes in
//! (-180, 180], radii in kilometres, and the widened f64 time column.
//! Earlier track dumps differed on all three, which is exactly why the
//! header spells them out.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{Result, TrackArchiveError, TrackBlock};

const MAGIC: &[u8; 4] = b"S9TK";
const VERSION: u16 = 1;

/// Longitudes are signed degrees in (-180, 180], not [0, 360).
const FLAG_LON_SIGNED: u16 = 1 << 0;
/// Radii are kilometres, not metres.
const FLAG_RADIUS_KM: u16 = 1 << 1;
/// The time row is f64, not f32.
const FLAG_TIME_F64: u16 = 1 << 2;

const FLAGS: u16 = FLAG_LON_SIGNED | FLAG_RADIUS_KM | FLAG_TIME_F64;

pub fn write_block<W: Write>(mut w: W, block: &TrackBlock) -> Result<()> {
    w.write_all(MAGIC)?;
    w.write_u16::<LittleEndian>(VERSION)?;
    w.write_u16::<LittleEndian>(FLAGS)?;
    w.write_u64::<LittleEndian>(block.len() as u64)?;

    for &t in &block.time_s {
        w.write_f64::<LittleEndian>(t)?;
    }
    for &v in &block.lat_deg {
        w.write_f32::<LittleEndian>(v)?;
    }
    for &v in &block.lon_deg {
        w.write_f32::<LittleEndian>(v)?;
    }
    for &v in &block.radius_km {
        w.write_f32::<LittleEndian>(v)?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_block<R: Read>(mut r: R, norad_id: u32) -> Result<TrackBlock> {
    let corrupt = |reason: &str| TrackArchiveError::Corrupt {
        norad_id,
        reason: reason.to_string(),
    };

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = r.read_u16::<LittleEndian>()?;
    if version != VERSION {
        return Err(corrupt(&format!("unsupported version {}", version)));
    }
    let flags = r.read_u16::<LittleEndian>()?;
    if flags != FLAGS {
        // A different convention word means a writer from another era;
        // refuse rather than misread metres as kilometres.
        return Err(corrupt(&format!("unsupported flags {:#06x}", flags)));
    }
    let n = r.read_u64::<LittleEndian>()? as usize;

    let mut block = TrackBlock {
        time_s: vec![0.0; n],
        lat_deg: vec![0.0; n],
        lon_deg: vec![0.0; n],
        radius_km: vec![0.0; n],
    };
    r.read_f64_into::<LittleEndian>(&mut block.time_s)?;
    r.read_f32_into::<LittleEndian>(&mut block.lat_deg)?;
    r.read_f32_into::<LittleEndian>(&mut block.lon_deg)?;
    r.read_f32_into::<LittleEndian>(&mut block.radius_km)?;
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_roundtrip_through_buffer() {
        let mut block = TrackBlock::default();
        block.push(1_230_768_000.0, 12.5, -45.25, 6771.0);
        block.push(1_230_768_060.0, 12.75, -45.0, 6771.5);

        let mut buf = Vec::new();
        write_block(&mut buf, &block).unwrap();
        let back = read_block(buf.as_slice(), 1).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_empty_block_roundtrip() {
        let block = TrackBlock::default();
        let mut buf = Vec::new();
        write_block(&mut buf, &block).unwrap();
        assert_eq!(read_block(buf.as_slice(), 1).unwrap().len(), 0);
    }

    #[test]
    fn test_foreign_flags_refused() {
        let mut block = TrackBlock::default();
        block.push(0.0, 0.0, 0.0, 7000.0);
        let mut buf = Vec::new();
        write_block(&mut buf, &block).unwrap();

        // Clear the kilometres flag in the header.
        buf[6] &= !(1 << 1);
        let err = read_block(buf.as_slice(), 9).unwrap_err();
        assert!(matches!(err, TrackArchiveError::Corrupt { norad_id: 9, .. }));
    }
}
