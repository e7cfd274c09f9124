//! Numeric literals with radix prefixes and binary-scale suffixes.

use thiserror::Error;

/// Radix markers, checked in order; the first match is stripped.
const INT_PREFIXES: &[(&str, u32)] = &[("0b", 2), ("0o", 8), ("0x", 16)];

/// Scale markers, checked in order after prefix stripping.
const INT_SUFFIXES: &[(&str, i128)] = &[
    ("k", 1024),
    ("M", 1024 * 1024),
    ("G", 1024 * 1024 * 1024),
];

/// Smallest accepted value
pub const MIN_LITERAL: i128 = i64::MIN as i128;

/// Largest accepted value; full 64-bit addresses must parse
pub const MAX_LITERAL: i128 = u64::MAX as i128;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("Invalid literal '{literal}': {reason}")]
    InvalidLiteral { literal: String, reason: String },
}

/// Parse an integer literal such as `0x1A`, `0b101`, `4k` or `-10`.
///
/// Results cover both signed and unsigned 64-bit values
/// (`MIN_LITERAL..=MAX_LITERAL`).
pub fn parse_int(text: &str) -> Result<i128, LiteralError> {
    let invalid = |reason: String| LiteralError::InvalidLiteral {
        literal: text.to_string(),
        reason,
    };

    let mut digits = text;
    let mut radix = 10;
    if let Some((prefix, base)) = INT_PREFIXES.iter().find(|(p, _)| digits.starts_with(p)) {
        radix = *base;
        digits = &digits[prefix.len()..];
    }

    let mut scale = 1;
    if let Some((suffix, factor)) = INT_SUFFIXES.iter().find(|(s, _)| digits.ends_with(s)) {
        scale = *factor;
        digits = &digits[..digits.len() - suffix.len()];
    }

    if digits.is_empty() {
        return Err(invalid("no digits".into()));
    }

    let value = i128::from_str_radix(digits, radix)
        .map_err(|e| invalid(format!("not a base-{} number ({})", radix, e)))?;

    value
        .checked_mul(scale)
        .filter(|v| (MIN_LITERAL..=MAX_LITERAL).contains(v))
        .ok_or_else(|| invalid("value out of range".into()))
}
