//! Coordinate conversion: APRS degree/minute fields and Maidenhead locators.
//!
//! Degree/minute fields may carry position ambiguity: trailing minute
//! digits replaced by spaces. Each blank is read as `5`, which puts the
//! result at the middle of the ambiguous range.
//!
//! Maidenhead cells:
//! - Field (`AA`-`RR`): 20° lon × 10° lat, anchored at (-180, -90)
//! - Square (`00`-`99`): 2° × 1°
//! - Subsquare (`aa`-`xx`): 5' × 2.5'

use crate::types::{AprsError, Result};

/// Which coordinate a degree/minute field encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn hemispheres(self) -> (char, char) {
        match self {
            Axis::Latitude => ('N', 'S'),
            Axis::Longitude => ('E', 'W'),
        }
    }

    fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

/// Convert degrees + minutes + hemisphere to signed decimal degrees.
///
/// `minutes` is the raw `MM.hh` text; spaces are ambiguity placeholders.
/// The hemisphere letter is case-insensitive and must match `axis`.
pub fn degrees_minutes_to_decimal(
    degrees: u16,
    minutes: &str,
    hemisphere: char,
    axis: Axis,
) -> Result<f64> {
    let filled = minutes.replace(' ', "5");
    let min: f64 = filled
        .parse()
        .map_err(|_| AprsError::FieldFormat(format!("invalid minutes field {minutes:?}")))?;

    let value = degrees as f64 + min / 60.0;

    let (positive, negative) = axis.hemispheres();
    match hemisphere.to_ascii_uppercase() {
        h if h == positive => Ok(value),
        h if h == negative => Ok(-value),
        _ => Err(AprsError::FieldFormat(format!(
            "invalid {} hemisphere: {hemisphere:?}",
            match axis {
                Axis::Latitude => "latitude",
                Axis::Longitude => "longitude",
            }
        ))),
    }
}

/// Format a latitude as APRS `DDMM.hhN`.
pub fn format_latitude(lat: f64) -> String {
    let (deg, min) = split_degrees(lat);
    let hemi = if lat < 0.0 { 'S' } else { 'N' };
    format!("{deg:02}{min:05.2}{hemi}")
}

/// Format a longitude as APRS `DDDMM.hhW`.
pub fn format_longitude(lon: f64) -> String {
    let (deg, min) = split_degrees(lon);
    let hemi = if lon < 0.0 { 'W' } else { 'E' };
    format!("{deg:03}{min:05.2}{hemi}")
}

/// Whole degrees and minutes rounded to hundredths, carrying 60.00 over.
fn split_degrees(value: f64) -> (u32, f64) {
    let abs = value.abs();
    let mut deg = abs.trunc() as u32;
    let mut hundredths = ((abs - deg as f64) * 6000.0).round() as u32;
    if hundredths >= 6000 {
        deg += 1;
        hundredths -= 6000;
    }
    (deg, hundredths as f64 / 100.0)
}

// ---------------------------------------------------------------------------
// Maidenhead
// ---------------------------------------------------------------------------

/// Decode a 4- or 6-character Maidenhead locator to the `(lon, lat)` of
/// its cell center. Extra characters past six are ignored.
pub fn gridlocator_to_lonlat(code: &str) -> Result<(f64, f64)> {
    let grid = code.trim().to_ascii_uppercase();
    let g = grid.as_bytes();
    if g.len() < 4 {
        return Err(AprsError::FieldFormat(format!("gridsquare too short: {code:?}")));
    }

    let field_lon = letter_index(g[0], b'R', code)?;
    let field_lat = letter_index(g[1], b'R', code)?;
    let square_lon = digit_index(g[2], code)?;
    let square_lat = digit_index(g[3], code)?;

    let mut lon = field_lon * 20.0 - 180.0 + square_lon * 2.0;
    let mut lat = field_lat * 10.0 - 90.0 + square_lat;

    if g.len() >= 6 {
        let sub_lon = letter_index(g[4], b'X', code)?;
        let sub_lat = letter_index(g[5], b'X', code)?;
        lon += sub_lon * (2.0 / 24.0) + 1.0 / 24.0;
        lat += sub_lat * (1.0 / 24.0) + 0.5 / 24.0;
    } else {
        lon += 1.0;
        lat += 0.5;
    }

    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(AprsError::FieldFormat(format!("gridsquare out of range: {code:?}")));
    }

    Ok((lon, lat))
}

fn letter_index(c: u8, last: u8, code: &str) -> Result<f64> {
    if (b'A'..=last).contains(&c) {
        Ok((c - b'A') as f64)
    } else {
        Err(AprsError::FieldFormat(format!(
            "invalid gridsquare letter {:?} in {code:?}",
            c as char
        )))
    }
}

fn digit_index(c: u8, code: &str) -> Result<f64> {
    if c.is_ascii_digit() {
        Ok((c - b'0') as f64)
    } else {
        Err(AprsError::FieldFormat(format!(
            "invalid gridsquare digit {:?} in {code:?}",
            c as char
        )))
    }
}

/// True when `value` is a valid coordinate on `axis`.
pub fn in_range(value: f64, axis: Axis) -> bool {
    value.abs() <= axis.limit()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dm_north_east() {
        let v = degrees_minutes_to_decimal(49, "03.50", 'N', Axis::Latitude).unwrap();
        assert!((v - 49.058333).abs() < 1e-6);
        let v = degrees_minutes_to_decimal(72, "01.75", 'e', Axis::Longitude).unwrap();
        assert!((v - 72.029167).abs() < 1e-6);
    }

    #[test]
    fn test_dm_south_west_negative() {
        let v = degrees_minutes_to_decimal(33, "30.00", 's', Axis::Latitude).unwrap();
        assert!((v + 33.5).abs() < 1e-9);
        let v = degrees_minutes_to_decimal(72, "01.75", 'W', Axis::Longitude).unwrap();
        assert!((v + 72.029167).abs() < 1e-6);
    }

    #[test]
    fn test_dm_wrong_hemisphere_for_axis() {
        assert!(degrees_minutes_to_decimal(49, "03.50", 'E', Axis::Latitude).is_err());
        assert!(degrees_minutes_to_decimal(72, "01.75", 'N', Axis::Longitude).is_err());
        assert!(degrees_minutes_to_decimal(72, "01.75", 'X', Axis::Longitude).is_err());
    }

    #[test]
    fn test_dm_ambiguity() {
        // "03.5 " -> 03.55
        let v = degrees_minutes_to_decimal(49, "03.5 ", 'N', Axis::Latitude).unwrap();
        assert!((v - (49.0 + 3.55 / 60.0)).abs() < 1e-9);
        // All minute digits blank -> 55.55
        let v = degrees_minutes_to_decimal(49, "  .  ", 'N', Axis::Latitude).unwrap();
        assert!((v - (49.0 + 55.55 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_dm_non_numeric() {
        assert!(degrees_minutes_to_decimal(49, "0x.50", 'N', Axis::Latitude).is_err());
    }

    #[test]
    fn test_format_roundtrip_within_hundredth_minute() {
        for &(lat, lon) in &[
            (49.058333, -72.029167),
            (-33.8688, 151.2093),
            (0.0, 0.0),
            (89.99999, -179.99999),
            (35.59949, -82.55148),
        ] {
            let lat_s = format_latitude(lat);
            let lon_s = format_longitude(lon);
            let lat_d = degrees_minutes_to_decimal(
                lat_s[0..2].parse().unwrap(),
                &lat_s[2..7],
                lat_s.chars().nth(7).unwrap(),
                Axis::Latitude,
            )
            .unwrap();
            let lon_d = degrees_minutes_to_decimal(
                lon_s[0..3].parse().unwrap(),
                &lon_s[3..8],
                lon_s.chars().nth(8).unwrap(),
                Axis::Longitude,
            )
            .unwrap();
            assert!((lat_d - lat).abs() <= 1.0 / 6000.0, "{lat} -> {lat_s} -> {lat_d}");
            assert!((lon_d - lon).abs() <= 1.0 / 6000.0, "{lon} -> {lon_s} -> {lon_d}");
        }
    }

    #[test]
    fn test_format_examples() {
        assert_eq!(format_latitude(49.058333), "4903.50N");
        assert_eq!(format_longitude(-72.029167), "07201.75W");
        assert_eq!(format_latitude(-0.99999), "0100.00S");
    }

    #[test]
    fn test_grid_four_char() {
        let (lon, lat) = gridlocator_to_lonlat("EN91").unwrap();
        assert!((lon - -81.0).abs() < 1e-9);
        assert!((lat - 41.5).abs() < 1e-9);
    }

    #[test]
    fn test_grid_six_char() {
        let (lon, lat) = gridlocator_to_lonlat("FN31pr").unwrap();
        // FN31pr center: -72.7083, 41.7292
        assert!((lon - -72.708333).abs() < 1e-5, "lon={lon}");
        assert!((lat - 41.729167).abs() < 1e-5, "lat={lat}");
    }

    #[test]
    fn test_grid_six_within_four() {
        for code in ["EN91kl", "FN31pr", "JO01aa", "RR99xx", "AA00aa"] {
            let (lon4, lat4) = gridlocator_to_lonlat(&code[..4]).unwrap();
            let (lon6, lat6) = gridlocator_to_lonlat(code).unwrap();
            assert!((lon6 - lon4).abs() < 1.0, "{code}");
            assert!((lat6 - lat4).abs() < 0.5, "{code}");
        }
    }

    #[test]
    fn test_grid_extremes() {
        let (lon, lat) = gridlocator_to_lonlat("AA00").unwrap();
        assert!((lon - -179.0).abs() < 1e-9);
        assert!((lat - -89.5).abs() < 1e-9);
        let (lon, lat) = gridlocator_to_lonlat("RR99").unwrap();
        assert!((lon - 179.0).abs() < 1e-9);
        assert!((lat - 89.5).abs() < 1e-9);
    }

    #[test]
    fn test_grid_invalid() {
        assert!(gridlocator_to_lonlat("EN9").is_err());
        assert!(gridlocator_to_lonlat("").is_err());
        assert!(gridlocator_to_lonlat("ZZ99").is_err());
        assert!(gridlocator_to_lonlat("ENx1").is_err());
        assert!(gridlocator_to_lonlat("EN91zz").is_err());
    }

    #[test]
    fn test_in_range() {
        assert!(in_range(-90.0, Axis::Latitude));
        assert!(!in_range(90.5, Axis::Latitude));
        assert!(in_range(179.9, Axis::Longitude));
    }
}
