// SPDX-License-Identifier: BUSL-1.1
//! # Identifier and Date Normalizers
//!
//! Each normalizer strips presentation formatting, canonicalizes the value,
//! and enforces the identifier family's length and check-digit rules. All of
//! them are idempotent: normalizing an already-canonical value returns it
//! unchanged.
//!
//! Inside a validation pass a failed normalization becomes one more entry in
//! the aggregate error list; these functions are also usable standalone.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

/// A value that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The value does not have the family's expected length after
    /// formatting is stripped.
    #[error("{family} must be {expected} characters, got {got}")]
    InvalidLength {
        /// Identifier family name (`ISRC`, `UPC`, `EAN`).
        family: &'static str,
        /// Canonical length for the family.
        expected: usize,
        /// Length after formatting was stripped.
        got: usize,
    },

    /// The value has the right length but the wrong character pattern.
    #[error("{family} has an invalid format: {value}")]
    InvalidPattern {
        /// Identifier family name.
        family: &'static str,
        /// The offending canonicalized value.
        value: String,
    },

    /// The check digit does not match the rest of the identifier.
    #[error("{family} check digit mismatch: {value}")]
    ChecksumMismatch {
        /// Identifier family name.
        family: &'static str,
        /// The offending canonicalized value.
        value: String,
    },

    /// The value is not a date in any accepted representation.
    #[error("unparsable date: {value}")]
    UnparsableDate {
        /// The offending input.
        value: String,
    },
}

// ---------------------------------------------------------------------------
// ISRC
// ---------------------------------------------------------------------------

/// Canonical ISRC length: 2-char country, 3-char registrant, 2-digit year,
/// 5-digit designation.
const ISRC_LEN: usize = 12;

/// Normalize an International Standard Recording Code.
///
/// Strips separators (`QM-9K-3120-0284` → `QM9K31200284`), uppercases, and
/// validates the structural pattern. ISRCs carry no check digit.
pub fn normalize_isrc(raw: &str) -> Result<String, NormalizeError> {
    let compact: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if compact.len() != ISRC_LEN {
        return Err(NormalizeError::InvalidLength {
            family: "ISRC",
            expected: ISRC_LEN,
            got: compact.len(),
        });
    }

    let bytes = compact.as_bytes();
    let pattern_ok = bytes[..2].iter().all(u8::is_ascii_alphabetic)
        && bytes[2..5].iter().all(u8::is_ascii_alphanumeric)
        && bytes[5..].iter().all(u8::is_ascii_digit);
    if !pattern_ok {
        return Err(NormalizeError::InvalidPattern {
            family: "ISRC",
            value: compact,
        });
    }

    Ok(compact)
}

// ---------------------------------------------------------------------------
// UPC / EAN
// ---------------------------------------------------------------------------

/// Canonical UPC-A length.
const UPC_LEN: usize = 12;
/// Canonical EAN-13 length.
const EAN_LEN: usize = 13;

/// Normalize a Universal Product Code.
///
/// Strips non-digits, trims the leading zeros of GTIN-13/14 renderings down
/// to the canonical 12 digits (`00616892587125` → `616892587125`), and
/// validates the UPC-A check digit.
pub fn normalize_upc(raw: &str) -> Result<String, NormalizeError> {
    let compact = trim_to_gtin(raw, UPC_LEN);

    if compact.len() != UPC_LEN {
        return Err(NormalizeError::InvalidLength {
            family: "UPC",
            expected: UPC_LEN,
            got: compact.len(),
        });
    }
    if !gtin_checksum_ok(&compact) {
        return Err(NormalizeError::ChecksumMismatch {
            family: "UPC",
            value: compact,
        });
    }

    Ok(compact)
}

/// Normalize an International Article Number.
///
/// Strips non-digits, trims zero padding down to 13 digits, and validates
/// the EAN-13 check digit.
pub fn normalize_ean(raw: &str) -> Result<String, NormalizeError> {
    let compact = trim_to_gtin(raw, EAN_LEN);

    if compact.len() != EAN_LEN {
        return Err(NormalizeError::InvalidLength {
            family: "EAN",
            expected: EAN_LEN,
            got: compact.len(),
        });
    }
    if !gtin_checksum_ok(&compact) {
        return Err(NormalizeError::ChecksumMismatch {
            family: "EAN",
            value: compact,
        });
    }

    Ok(compact)
}

/// Strip non-digits and trim leading zeros down to the target length.
///
/// Zeros are only removed while the value is longer than the target, so a
/// canonical value with significant leading zeros is untouched.
fn trim_to_gtin(raw: &str, target: usize) -> String {
    let compact: String = raw.chars().filter(char::is_ascii_digit).collect();
    let excess = compact.len().saturating_sub(target);
    let leading_zeros = compact.chars().take_while(|c| *c == '0').count();
    compact[excess.min(leading_zeros)..].to_string()
}

/// GTIN mod-10 check: weights 3/1 alternating from the digit adjacent to the
/// check digit. Covers UPC-A (12) and EAN-13 (13) alike.
fn gtin_checksum_ok(digits: &str) -> bool {
    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    let (body, check) = match values.split_last() {
        Some((check, body)) => (body, *check),
        None => return false,
    };

    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    (10 - sum % 10) % 10 == check
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Canonical output representation for normalized dates.
const DATE_CANONICAL: &str = "%Y-%m-%d";

/// Date-only input formats accepted besides the canonical one.
const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%B %d, %Y"];

/// Datetime input formats; the date part is kept.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Normalize a date to the canonical ISO-8601 `YYYY-MM-DD` form.
///
/// Accepts ISO-8601 dates, RFC 3339 timestamps, and common locale variants
/// (`2016/03/25`, `03/25/2016`, `25 Mar 2016`, `March 25, 2016`).
pub fn normalize_date(raw: &str) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();

    // Canonical fast path keeps normalization idempotent by construction.
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_CANONICAL) {
        return Ok(date.format(DATE_CANONICAL).to_string());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.format(DATE_CANONICAL).to_string());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.date_naive().format(DATE_CANONICAL).to_string());
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date().format(DATE_CANONICAL).to_string());
        }
    }

    Err(NormalizeError::UnparsableDate {
        value: trimmed.to_string(),
    })
}
