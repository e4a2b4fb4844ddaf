//! Uncompressed ("normal") position and object report decoding.
//!
//! Layout after the data type identifier (and the 7-byte timestamp for `/`):
//!
//! ```text
//! DDMM.hhN T DDDMM.hhW S comment
//! |        | |         | `- free text
//! |        | |         `--- symbol code
//! |        | `------------- longitude, blanks allowed in minutes
//! |        `--------------- symbol table / overlay
//! `------------------------ latitude, blanks allowed in minutes
//! ```
//!
//! Objects (`;`) are a 9-byte name, a live/killed marker, then the same
//! timestamped layout.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::coord::{degrees_minutes_to_decimal, in_range, Axis};
use crate::types::{AprsError, ObjectInfo, Result};

/// Shortest payload (data type identifier included) worth matching.
pub const MIN_POSITION_LEN: usize = 18;
/// Shortest object payload.
pub const MIN_OBJECT_LEN: usize = 18;

const TIMESTAMP_LEN: usize = 7;
const OBJECT_NAME_LEN: usize = 9;
const OBJECT_MARKER_OFFSET: usize = 1 + OBJECT_NAME_LEN;

static NORMAL_POSITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s-u)^([0-9]{2})([0-9 ]{2}\.[0-9 ]{2})([NnSs])([/\\0-9A-Z])([0-9]{3})([0-9 ]{2}\.[0-9 ]{2})([EeWw])([\x21-\x7e])(.*)$",
    )
    .unwrap()
});

/// Fields recovered from a normal position body.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFields {
    pub lat: f64,
    pub lon: f64,
    pub symbol_table: char,
    pub symbol: char,
    pub comment: String,
}

/// Decode a `!`, `/` or `=` payload (data type identifier included).
pub fn parse_position(payload: &[u8]) -> Result<PositionFields> {
    if payload.len() < MIN_POSITION_LEN {
        return Err(AprsError::FieldFormat(format!(
            "position report too short: {} bytes",
            payload.len()
        )));
    }

    let mut body = &payload[1..];
    if payload[0] == b'/' {
        // Timestamp is not modelled; skip it unchecked.
        if body.len() < TIMESTAMP_LEN {
            return Err(AprsError::FieldFormat("timestamped report too short".into()));
        }
        body = &body[TIMESTAMP_LEN..];
    }

    let caps = NORMAL_POSITION_RE
        .captures(body)
        .ok_or_else(|| AprsError::FieldFormat("invalid uncompressed position format".into()))?;

    let lat = degrees_minutes_to_decimal(
        ascii_number(&caps[1]),
        ascii_str(&caps[2]),
        caps[3][0] as char,
        Axis::Latitude,
    )?;
    let lon = degrees_minutes_to_decimal(
        ascii_number(&caps[5]),
        ascii_str(&caps[6]),
        caps[7][0] as char,
        Axis::Longitude,
    )?;

    if !in_range(lat, Axis::Latitude) || !in_range(lon, Axis::Longitude) {
        return Err(AprsError::FieldFormat(format!(
            "position out of range: {lat:.4}, {lon:.4}"
        )));
    }

    Ok(PositionFields {
        lat,
        lon,
        symbol_table: caps[4][0] as char,
        symbol: caps[8][0] as char,
        comment: String::from_utf8_lossy(&caps[9]).trim().to_string(),
    })
}

/// Decode a `;` object report.
///
/// The position part is re-read as a timestamped (`/`) report.
pub fn parse_object(payload: &[u8]) -> Result<(ObjectInfo, PositionFields)> {
    if payload.first() != Some(&b';') {
        return Err(AprsError::FieldFormat("not an object report".into()));
    }
    if payload.len() < MIN_OBJECT_LEN {
        return Err(AprsError::FieldFormat("object report too short".into()));
    }

    let live = match payload[OBJECT_MARKER_OFFSET] {
        b'*' => true,
        b'_' => false,
        other => {
            return Err(AprsError::FieldFormat(format!(
                "invalid object marker: {:?}",
                other as char
            )))
        }
    };

    let name = String::from_utf8_lossy(&payload[1..OBJECT_MARKER_OFFSET])
        .trim()
        .to_string();

    let mut timestamped = Vec::with_capacity(payload.len());
    timestamped.push(b'/');
    timestamped.extend_from_slice(&payload[OBJECT_MARKER_OFFSET + 1..]);
    let fields = parse_position(&timestamped)?;

    Ok((ObjectInfo { name, live }, fields))
}

/// Regex captures below are ASCII digits only.
fn ascii_number(digits: &[u8]) -> u16 {
    digits
        .iter()
        .fold(0u16, |acc, d| acc * 10 + (d - b'0') as u16)
}

fn ascii_str(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_position() {
        let p = parse_position(b"!4903.50N/07201.75W-Test 001234").unwrap();
        assert!((p.lat - 49.058333).abs() < 1e-4);
        assert!((p.lon - -72.029167).abs() < 1e-4);
        assert_eq!(p.symbol_table, '/');
        assert_eq!(p.symbol, '-');
        assert_eq!(p.comment, "Test 001234");
    }

    #[test]
    fn test_messaging_position() {
        let p = parse_position(b"=3516.21N\\08233.12W#PHG5130").unwrap();
        assert!((p.lat - 35.270167).abs() < 1e-4);
        assert!((p.lon - -82.552).abs() < 1e-4);
        assert_eq!(p.symbol_table, '\\');
        assert_eq!(p.symbol, '#');
    }

    #[test]
    fn test_timestamped_position() {
        let p = parse_position(b"/092345z4903.50N/07201.75W>Moving").unwrap();
        assert!((p.lat - 49.058333).abs() < 1e-4);
        assert_eq!(p.symbol, '>');
        assert_eq!(p.comment, "Moving");
    }

    #[test]
    fn test_overlay_symbol_table() {
        let p = parse_position(b"!4903.50S907201.75E&").unwrap();
        assert!(p.lat < 0.0);
        assert!(p.lon > 0.0);
        assert_eq!(p.symbol_table, '9');
    }

    #[test]
    fn test_ambiguous_position() {
        let p = parse_position(b"!4903.  N/07201.  W-").unwrap();
        assert!((p.lat - (49.0 + 3.55 / 60.0)).abs() < 1e-9);
        assert!((p.lon - -(72.0 + 1.55 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_position_too_short() {
        assert!(parse_position(b"!4903.50N/0720").is_err());
        assert!(parse_position(b"").is_err());
    }

    #[test]
    fn test_position_bad_separator() {
        // lowercase symbol table is not allowed
        assert!(parse_position(b"!4903.50Nx07201.75W-").is_err());
    }

    #[test]
    fn test_position_bad_hemisphere() {
        assert!(parse_position(b"!4903.50X/07201.75W-").is_err());
    }

    #[test]
    fn test_position_out_of_range() {
        assert!(parse_position(b"!9903.50N/07201.75W-").is_err());
        assert!(parse_position(b"!4903.50N/19001.75W-").is_err());
    }

    #[test]
    fn test_object_live() {
        let (obj, p) = parse_object(b";LEADER   *092345z4903.50N/07201.75W>088/036").unwrap();
        assert_eq!(obj.name, "LEADER");
        assert!(obj.live);
        assert!((p.lat - 49.058333).abs() < 1e-4);
        assert_eq!(p.comment, "088/036");
    }

    #[test]
    fn test_object_killed() {
        let (obj, _) = parse_object(b";HAMFEST  _111111z4903.50N/07201.75W-").unwrap();
        assert!(!obj.live);
    }

    #[test]
    fn test_object_bad_marker() {
        let err = parse_object(b";LEADER   X092345z4903.50N/07201.75W>").unwrap_err();
        assert!(matches!(err, AprsError::FieldFormat(_)));
    }

    #[test]
    fn test_object_too_short() {
        assert!(parse_object(b";LEADER   *").is_err());
    }
}
