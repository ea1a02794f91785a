//! Kubernetes resource quantity parsing and comparison
//!
//! A quantity keeps the string it was written as - the patch we emit must
//! echo the operator's spelling (`"1G"` stays `"1G"`) - alongside a
//! canonical milli-unit magnitude used for ordering. Memory quantities are
//! milli-bytes, CPU quantities are millicores, so `"512Mi"` and `"1G"`
//! compare correctly and `"100m"` orders below `"0.5"`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::{Error, Result};

/// Milli-units per whole unit (one core, one byte).
const MILLIS: i128 = 1000;

/// Maximum number of significant digits accepted, matching the precision
/// cap of the upstream quantity format.
const MAX_DIGITS: usize = 18;

/// A Kubernetes resource quantity such as `"512Mi"`, `"1G"`, `"0.5"` or
/// `"100m"`. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Quantity {
    raw: String,
    millis: Option<i128>,
}

impl Quantity {
    /// Parse a quantity string, failing with [`Error::InvalidQuantity`] on
    /// malformed input. Used for operator-configured defaults, which must
    /// be well-formed for the process to start.
    pub fn parse(raw: &str) -> Result<Self> {
        let millis = parse_millis(raw).map_err(|reason| Error::invalid_quantity(raw, reason))?;
        Ok(Self {
            raw: raw.to_string(),
            millis: Some(millis),
        })
    }

    /// Wrap a user-declared value without rejecting it.
    ///
    /// A malformed value stays *present* (so no default is injected over
    /// it) but is incomparable; the API server's own schema validation
    /// owns rejecting it.
    pub fn lenient(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            millis: parse_millis(raw).ok(),
        }
    }

    /// The quantity exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the quantity parsed and can participate in ordering.
    pub fn is_comparable(&self) -> bool {
        self.millis.is_some()
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        match (self.millis, other.millis) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.raw == other.raw,
            _ => false,
        }
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.millis, other.millis) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (None, None) if self.raw == other.raw => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Parse a quantity string into milli-units.
///
/// Accepted forms: plain decimals (`"2"`, `"0.5"`), the milli suffix
/// (`"100m"`), decimal SI suffixes (`k M G T P E`) and binary suffixes
/// (`Ki Mi Gi Ti Pi Ei`). Fractions below one milli-unit truncate toward
/// zero.
fn parse_millis(raw: &str) -> std::result::Result<i128, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty string".to_string());
    }
    if s.starts_with('-') {
        return Err("resource quantities must not be negative".to_string());
    }
    let s = s.strip_prefix('+').unwrap_or(s);

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let factor = suffix_factor_millis(suffix)?;

    let (int_part, frac_part) = match number.split_once('.') {
        Some((_, f)) if f.contains('.') => {
            return Err("more than one decimal point".to_string());
        }
        Some((i, f)) => (i, f),
        None => (number, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err("missing numeric value".to_string());
    }
    if int_part.len() + frac_part.len() > MAX_DIGITS {
        return Err("too many digits".to_string());
    }

    let mut numer: i128 = 0;
    for c in int_part.chars().chain(frac_part.chars()) {
        numer = numer * 10 + i128::from(c as u8 - b'0');
    }
    let mut denom: i128 = 1;
    for _ in 0..frac_part.len() {
        denom *= 10;
    }

    let scaled = numer
        .checked_mul(factor)
        .ok_or_else(|| "value out of range".to_string())?;
    Ok(scaled / denom)
}

/// Milli-units represented by one unit of the given suffix.
fn suffix_factor_millis(suffix: &str) -> std::result::Result<i128, String> {
    match suffix {
        "" => Ok(MILLIS),
        "m" => Ok(1),
        "k" => Ok(1_000 * MILLIS),
        "M" => Ok(1_000_000 * MILLIS),
        "G" => Ok(1_000_000_000 * MILLIS),
        "T" => Ok(1_000_000_000_000 * MILLIS),
        "P" => Ok(1_000_000_000_000_000 * MILLIS),
        "E" => Ok(1_000_000_000_000_000_000 * MILLIS),
        "Ki" => Ok((1_i128 << 10) * MILLIS),
        "Mi" => Ok((1_i128 << 20) * MILLIS),
        "Gi" => Ok((1_i128 << 30) * MILLIS),
        "Ti" => Ok((1_i128 << 40) * MILLIS),
        "Pi" => Ok((1_i128 << 50) * MILLIS),
        "Ei" => Ok((1_i128 << 60) * MILLIS),
        _ => Err(format!("unknown suffix {suffix:?}")),
    }
}
