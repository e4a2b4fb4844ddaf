//! Noise filter: suppress automated traffic that arrives as messages.
//!
//! Telemetry stations announce their channel definitions (`PARM.`, `UNIT.`,
//! `EQNS.`, `BITS.`) as messages addressed to themselves, and weather
//! service gateways flood bulletins. None of it is person-to-person.

use crate::types::{MessageReport, NoiseReason};

/// Body prefixes of telemetry definition messages.
pub const TELEMETRY_KEYWORDS: &[&str] = &["PARM", "UNIT", "EQNS", "BITS"];

/// Substring marking weather service senders.
const WEATHER_SERVICE_TAG: &str = "NWS";

/// Classify a message. `Some(reason)` means it is not user traffic.
pub fn classify(from: &str, to: &str, text: &str) -> Option<NoiseReason> {
    if from == to {
        return Some(NoiseReason::SelfAddressed);
    }

    if let Some(&kw) = TELEMETRY_KEYWORDS.iter().find(|kw| text.starts_with(**kw)) {
        return Some(NoiseReason::Telemetry(kw));
    }

    if from.contains(WEATHER_SERVICE_TAG) {
        return Some(NoiseReason::WeatherService);
    }

    None
}

/// Classify a decoded message report.
pub fn classify_message(msg: &MessageReport) -> Option<NoiseReason> {
    classify(msg.source.as_str(), &msg.to, &msg.text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StationId;

    #[test]
    fn test_self_addressed() {
        assert_eq!(
            classify("N0CALL-1", "N0CALL-1", "hello"),
            Some(NoiseReason::SelfAddressed)
        );
        // Different SSID is a different station
        assert_eq!(classify("N0CALL-1", "N0CALL-2", "hello"), None);
    }

    #[test]
    fn test_telemetry_keywords() {
        for kw in TELEMETRY_KEYWORDS {
            let body = format!("{kw}.Volts,Temp");
            assert_eq!(
                classify("N0CALL", "KD9XYZ", &body),
                Some(NoiseReason::Telemetry(*kw))
            );
        }
        // Keyword must be a prefix
        assert_eq!(classify("N0CALL", "KD9XYZ", "my PARM list"), None);
    }

    #[test]
    fn test_weather_service() {
        assert_eq!(
            classify("NWSILN", "KD9XYZ", "Tornado watch"),
            Some(NoiseReason::WeatherService)
        );
        assert_eq!(
            classify("K0NWS-3", "KD9XYZ", "hi"),
            Some(NoiseReason::WeatherService)
        );
    }

    #[test]
    fn test_user_message_passes() {
        let msg = MessageReport {
            source: StationId::new("N0CALL-9"),
            to: "KD9XYZ".into(),
            text: "Hello".into(),
            id: Some("001".into()),
        };
        assert_eq!(classify_message(&msg), None);
    }
}
