//! Shared plumbing for the overwatch binary: AIS CSV I/O and the
//! boundary-time parser. Everything numeric past this layer works in
//! integer seconds since the Unix epoch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

pub mod ais;

/// Invalid paths or schema. The binary maps this to exit code 2;
/// everything else is an unexpected failure and exits 1.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Parse a boundary time: raw epoch seconds, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD HH:MM:SS`, or a bare date (midnight UTC).
pub fn parse_time(s: &str) -> Result<i64, UsageError> {
    if let Ok(t) = s.parse::<i64>() {
        return Ok(t);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(to_epoch_s(dt));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(to_epoch_s(dt));
        }
    }
    Err(UsageError(format!(
        "cannot parse '{}' as a time; use epoch seconds or e.g. 2015-01-07T09:32:12",
        s
    )))
}

fn to_epoch_s(dt: NaiveDateTime) -> i64 {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(parse_time("0").unwrap(), 0);
        assert_eq!(parse_time("1420000000").unwrap(), 1_420_000_000);
        assert_eq!(parse_time("2015-01-01T00:00:00").unwrap(), 1_420_070_400);
        assert_eq!(parse_time("2015-01-01 00:00:00").unwrap(), 1_420_070_400);
        assert_eq!(parse_time("2015-01-01").unwrap(), 1_420_070_400);
        assert!(parse_time("next tuesday").is_err());
    }
}
