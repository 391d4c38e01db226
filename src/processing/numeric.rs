//! Locale-aware numeric parsing for landing figures.
//!
//! Exports use a comma as decimal mark and spaces (often non-breaking) as thousands separators,
//! e.g. `"1 234,5"`. Blank cells and the dash/dot placeholders mean "nothing landed".

use crate::error::NumericParseError;
use crate::types::Value;

/// Whitespace variants stripped from numeric text.
const STRIPPED: [char; 6] = [' ', '\u{00A0}', '\u{202F}', '\t', '\n', '\r'];

/// Convert one cell to `f64`.
///
/// Rules, in order:
///
/// - [`Value::Null`] is `0.0`
/// - numeric cells pass through
/// - text that is empty, `-` or `.` (after whitespace removal) is `0.0`
/// - whitespace variants are removed and `,` is read as the decimal mark
/// - anything that still does not parse, or parses to a non-finite value, is an error carrying
///   the original text
pub fn to_float(cell: &Value) -> Result<f64, NumericParseError> {
    match cell {
        Value::Null => Ok(0.0),
        Value::Int64(v) => Ok(*v as f64),
        Value::Float64(v) => Ok(*v),
        Value::Utf8(raw) => parse_text(raw),
        Value::Date(d) => Err(NumericParseError { raw: d.to_string() }),
    }
}

/// Parse numeric text. See [`to_float`] for the rules.
pub fn parse_text(raw: &str) -> Result<f64, NumericParseError> {
    let compact: String = raw.chars().filter(|c| !STRIPPED.contains(c)).collect();
    if matches!(compact.as_str(), "" | "-" | ".") {
        return Ok(0.0);
    }

    compact
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| NumericParseError { raw: raw.to_string() })
}
