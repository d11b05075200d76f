//! Ingest of raw two-line element text.
//!
//! Accepts plain concatenated TLE streams as published in the historical
//! catalog exports: pairs of "1 ..."/"2 ..." lines, optionally preceded
//! by a name line (3LE). Blank lines are skipped. Each pair is parsed to
//! derive its epoch and NORAD id; any pair that does not parse aborts
//! the ingest.

use std::io::BufRead;

use tracing::{debug, info};

use crate::{Result, TleArchiveError, TleRecord, TleStore};

/// Read every TLE pair from `reader`, deriving sort keys as we go.
pub fn read_tle_text<R: BufRead>(reader: R) -> Result<Vec<TleRecord>> {
    let mut records = Vec::new();
    let mut pending_line1: Option<String> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| TleArchiveError::Io {
            path: "<tle text>".into(),
            source: e,
        })?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        match (line.bytes().next(), &pending_line1) {
            (Some(b'1'), _) if line.len() > 2 && line.as_bytes()[1] == b' ' => {
                if pending_line1.is_some() {
                    return Err(TleArchiveError::MalformedTle {
                        index: lineno,
                        reason: "line 1 followed by another line 1".into(),
                    });
                }
                pending_line1 = Some(line.to_string());
            }
            (Some(b'2'), Some(_)) if line.len() > 2 && line.as_bytes()[1] == b' ' => {
                let line1 = pending_line1.take().expect("guarded by match arm");
                let rec = TleRecord::from_lines(records.len(), &line1, line)?;
                records.push(rec);
            }
            (_, Some(_)) => {
                return Err(TleArchiveError::MalformedTle {
                    index: lineno,
                    reason: "line 1 not followed by a line 2".into(),
                });
            }
            // A name line (3LE header) or other leader; ignore.
            _ => debug!(lineno, "skipping non-TLE line"),
        }
    }

    if pending_line1.is_some() {
        return Err(TleArchiveError::MalformedTle {
            index: records.len(),
            reason: "dangling line 1 at end of input".into(),
        });
    }

    info!(records = records.len(), "ingested TLE text");
    Ok(records)
}

/// Convenience wrapper: ingest one or more text streams into a store.
pub fn store_from_text<R: BufRead>(readers: Vec<R>) -> Result<TleStore> {
    let mut all = Vec::new();
    for reader in readers {
        all.extend(read_tle_text(reader)?);
    }
    Ok(TleStore::from_records(all))
}
