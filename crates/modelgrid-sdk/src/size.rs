//! Parsing for human-readable byte sizes.
//!
//! The platform reports limits such as the maximum upload chunk size as
//! strings like `"1M"` or `"512Ki"`; this module turns them into byte counts.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)([a-zA-Z]{0,2})$").expect("size pattern is valid"));

/// Parses a human-readable data size such as `"10M"` into a byte count.
///
/// Single-letter units `K`/`M`/`G`/`T` are decimal powers of 1000 and
/// `Ki`/`Mi`/`Gi`/`Ti` are binary powers of 1024. The two-letter `KB`/`MB`/
/// `GB`/`TB` forms resolve to the binary values, matching how the platform
/// reads them. `i` selects plain bytes. A unit suffix is required, the
/// numeric part must be a whole number, and the result must be positive.
///
/// # Errors
///
/// Returns [`Error::InvalidSize`] when the string does not have the shape
/// above or the value does not fit in a `u64`.
pub fn parse_data_size(value: &str) -> Result<u64> {
    let invalid = |message: &str| Error::InvalidSize {
        value: value.to_string(),
        message: message.to_string(),
    };

    let captures = SIZE_PATTERN
        .captures(value)
        .ok_or_else(|| invalid("expected digits followed by a unit suffix"))?;
    let number: u64 = captures[1]
        .parse()
        .map_err(|_| invalid("fractional sizes are not supported"))?;
    let multiplier: u64 = match &captures[2] {
        "i" => 1,
        "K" => 1_000,
        "M" => 1_000_000,
        "G" => 1_000_000_000,
        "T" => 1_000_000_000_000,
        "Ki" | "KB" => 1 << 10,
        "Mi" | "MB" => 1 << 20,
        "Gi" | "GB" => 1 << 30,
        "Ti" | "TB" => 1 << 40,
        "" => return Err(invalid("missing unit suffix")),
        unit => return Err(invalid(&format!("unknown unit {unit:?}"))),
    };

    let bytes = number
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("size does not fit in 64 bits"))?;
    if bytes == 0 {
        return Err(invalid("size must be positive"));
    }
    Ok(bytes)
}
