//! Timestamp canonicalization.
//!
//! Log timestamps are naive wall-clock strings written in the timezone of
//! the host that produced the log. `resolve` attaches the configured source
//! offset to the parsed value (it does not convert from it) and then
//! converts to UTC.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("unparsable timestamp: {0:?}")]
    Malformed(String),
}

/// Formats carrying a full date
const DATED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%a %b %d %H:%M:%S %Y",
];

/// Syslog-style formats with no year, tried after prefixing the assumed year
const YEARLESS_FORMATS: &[&str] = &["%Y %b %d %H:%M:%S", "%Y %a %b %d %H:%M:%S"];

/// Host-local offset, the default source timezone when the operator
/// configures none.
pub fn local_offset() -> FixedOffset {
    *Local::now().offset()
}

/// Resolve a raw log timestamp to a UTC instant, interpreting the naive
/// value as wall-clock time at `source_offset`.
///
/// Syslog dates omit the year; the current year at `source_offset` is
/// assumed. Around New Year this can misdate entries from rotated logs by a
/// year — inherited from the log format itself and kept as documented
/// behavior.
pub fn resolve(raw: &str, source_offset: FixedOffset) -> Result<DateTime<Utc>, TimestampError> {
    // Syslog pads single-digit days with an extra space
    let squeezed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if squeezed.is_empty() {
        return Err(TimestampError::Malformed(raw.to_string()));
    }

    for format in DATED_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&squeezed, format) {
            return to_utc(naive, source_offset, raw);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&squeezed, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return to_utc(midnight, source_offset, raw);
    }

    let year = Utc::now().with_timezone(&source_offset).year();
    let with_year = format!("{year} {squeezed}");
    for format in YEARLESS_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&with_year, format) {
            return to_utc(naive, source_offset, raw);
        }
    }

    Err(TimestampError::Malformed(raw.to_string()))
}

fn to_utc(
    naive: NaiveDateTime,
    offset: FixedOffset,
    raw: &str,
) -> Result<DateTime<Utc>, TimestampError> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|resolved| resolved.with_timezone(&Utc))
        .ok_or_else(|| TimestampError::Malformed(raw.to_string()))
}
