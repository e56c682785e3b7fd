//! Archive identifier construction and parsing.
//!
//! Identifiers follow the grammar
//! `YYYY-MM-DD[_PREFIX].tar.gz[.bin]`, where the trailing `.bin` appears
//! when an encrypting remote wraps the archive.

use chrono::NaiveDate;

/// Extension every archive carries.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Extra extension added by an encrypting remote.
pub const ENCRYPTED_SUFFIX: &str = ".bin";

/// Build the archive identifier for a given calendar date.
///
/// `2024-03-07.tar.gz` for the empty prefix, `2024-03-07_www.tar.gz` for
/// prefix `www`. Month and day are zero-padded.
pub fn build_identifier(date: NaiveDate, prefix: &str) -> String {
    if prefix.is_empty() {
        format!("{}{}", date.format("%Y-%m-%d"), ARCHIVE_SUFFIX)
    } else {
        format!("{}_{}{}", date.format("%Y-%m-%d"), prefix, ARCHIVE_SUFFIX)
    }
}

/// Extract the leading `YYYY-MM-DD` date from an identifier.
///
/// Only the digit shape is checked before date construction (month 01-12,
/// day 01-31); digit-shaped values that are not real calendar dates
/// (e.g. `2024-02-31`) are rejected when the date is built. Returns `None`
/// for anything that does not start with a well-formed date.
pub fn extract_date(identifier: &str) -> Option<NaiveDate> {
    let head = identifier.as_bytes().get(..10)?;
    if head[4] != b'-' || head[7] != b'-' {
        return None;
    }
    for (i, b) in head.iter().enumerate() {
        if i != 4 && i != 7 && !b.is_ascii_digit() {
            return None;
        }
    }

    let year: i32 = identifier[0..4].parse().ok()?;
    let month: u32 = identifier[5..7].parse().ok()?;
    let day: u32 = identifier[8..10].parse().ok()?;

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}
