//! Shared types, error enum, and decoded event types for aprs-core.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// All errors produced by aprs-core.
///
/// Every variant except `Io` and `EndOfStream` is local to one
/// frame: the caller drops the frame and keeps reading.
#[derive(Debug, Error)]
pub enum AprsError {
    #[error("framing error: {0}")]
    Framing(String),
    /// The byte source closed cleanly.
    #[error("end of stream")]
    EndOfStream,
    #[error("header error: {0}")]
    Header(String),
    #[error("unsupported data type: {0:?}")]
    UnsupportedFormat(char),
    #[error("field format error: {0}")]
    FieldFormat(String),
    /// Decoded fine, but classified as automated traffic.
    #[error("filtered: {0}")]
    Filtered(NoiseReason),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl AprsError {
    /// True for the suppressed-as-noise outcome, which is not a failure.
    pub fn is_filtered(&self) -> bool {
        matches!(self, AprsError::Filtered(_))
    }

    /// True when the input stream is gone and the reading loop should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AprsError::Io(_) | AprsError::EndOfStream)
    }
}

pub type Result<T> = std::result::Result<T, AprsError>;

// ---------------------------------------------------------------------------
// Noise classification
// ---------------------------------------------------------------------------

/// Why a message event was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoiseReason {
    /// Sender and recipient are the same station.
    SelfAddressed,
    /// Body starts with a telemetry definition keyword.
    Telemetry(&'static str),
    /// Sender looks like a weather service bulletin feed.
    WeatherService,
}

impl fmt::Display for NoiseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseReason::SelfAddressed => write!(f, "self-addressed message"),
            NoiseReason::Telemetry(kw) => write!(f, "telemetry keyword {kw}"),
            NoiseReason::WeatherService => write!(f, "weather service sender"),
        }
    }
}

// ---------------------------------------------------------------------------
// Station identifier
// ---------------------------------------------------------------------------

/// Station identifier: base call plus optional `-SSID`, e.g. `N0CALL-9`.
///
/// Equality is exact string equality, so `N0CALL` and `N0CALL-9` are
/// different stations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    /// Wrap an identifier taken verbatim from a text header.
    pub fn new(id: impl Into<String>) -> Self {
        StationId(id.into())
    }

    /// Build from a decoded base call and numeric SSID (0 is omitted).
    pub fn from_parts(base: &str, ssid: u8) -> Self {
        if ssid > 0 {
            StationId(format!("{base}-{ssid}"))
        } else {
            StationId(base.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base call without the SSID suffix.
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or("")
    }

    /// Numeric SSID, if present and in 0-15.
    pub fn ssid(&self) -> Option<u8> {
        let (_, suffix) = self.0.split_once('-')?;
        suffix.parse::<u8>().ok().filter(|s| *s <= 15)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StationId {
    fn from(s: &str) -> Self {
        StationId::new(s)
    }
}

impl PartialEq<str> for StationId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StationId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ---------------------------------------------------------------------------
// Decoded events
// ---------------------------------------------------------------------------

/// Extra detail carried by object reports (`;`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub name: String,
    /// `*` = live, `_` = killed.
    pub live: bool,
}

/// Position report (`!`, `/`, `=`, `;`, or recovered from a stray `!`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub source: StationId,
    /// Signed decimal degrees, north positive.
    pub lat: f64,
    /// Signed decimal degrees, east positive.
    pub lon: f64,
    pub symbol_table: char,
    pub symbol: char,
    pub comment: String,
    pub object: Option<ObjectInfo>,
}

/// Text message (`:`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageReport {
    pub source: StationId,
    pub to: String,
    pub text: String,
    pub id: Option<String>,
}

/// The core's output value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    Position(PositionReport),
    Message(MessageReport),
}

impl Event {
    /// Source station for any event.
    pub fn source(&self) -> &StationId {
        match self {
            Event::Position(p) => &p.source,
            Event::Message(m) => &m.source,
        }
    }

    /// `(lat, lon)` for position events.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Event::Position(p) => Some((p.lat, p.lon)),
            Event::Message(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_id_parts() {
        let id = StationId::new("N0CALL-9");
        assert_eq!(id.base(), "N0CALL");
        assert_eq!(id.ssid(), Some(9));
        assert_eq!(StationId::new("N0CALL").ssid(), None);
    }

    #[test]
    fn test_station_id_from_parts() {
        assert_eq!(StationId::from_parts("N0CALL", 0), "N0CALL");
        assert_eq!(StationId::from_parts("N0CALL", 15), "N0CALL-15");
    }

    #[test]
    fn test_station_id_ssid_distinct() {
        assert_ne!(StationId::new("N0CALL"), StationId::new("N0CALL-1"));
    }

    #[test]
    fn test_station_id_non_numeric_ssid() {
        assert_eq!(StationId::new("N0CALL-S").ssid(), None);
        assert_eq!(StationId::new("N0CALL-16").ssid(), None);
    }

    #[test]
    fn test_error_classification() {
        assert!(AprsError::Filtered(NoiseReason::SelfAddressed).is_filtered());
        assert!(!AprsError::Header("short".into()).is_filtered());
        assert!(AprsError::EndOfStream.is_terminal());
        assert!(!AprsError::Framing("end of stream".into()).is_terminal());
        assert!(!AprsError::Framing("bad escape".into()).is_terminal());
        assert!(!AprsError::UnsupportedFormat('T').is_terminal());
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = Event::Message(MessageReport {
            source: StationId::new("N0CALL-9"),
            to: "KD9XYZ".into(),
            text: "Hello".into(),
            id: Some("001".into()),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Message");
        assert_eq!(json["source"], "N0CALL-9");
        assert_eq!(json["id"], "001");
    }
}
