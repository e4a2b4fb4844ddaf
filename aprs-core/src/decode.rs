//! Decode frames into typed events.
//!
//! The payload's first byte (data type identifier) selects a decoder.
//! Matchers are tried in table order; a matcher may decline a payload it
//! claimed, in which case dispatch falls through to the recovery scan:
//!
//! - `!` `/` `=`: normal position
//! - `;`:         object report (declines on a bad object marker)
//! - `:`:         message, then the noise filter
//! - otherwise:   recovery scan for a stray `!` in the first 40 bytes

use crate::ax25::parse_header;
use crate::message::parse_message;
use crate::noise;
use crate::position::{parse_object, parse_position, PositionFields};
use crate::types::*;

/// How far into a payload the recovery scan looks for `!`.
pub const RECOVERY_SCAN_LIMIT: usize = 40;

/// A decoder bound to the data type identifiers it handles.
struct Matcher {
    name: &'static str,
    data_types: &'static [u8],
    /// `None` declines the payload and lets dispatch continue.
    decode: fn(&StationId, &[u8]) -> Option<Result<Event>>,
}

/// Fixed priority order.
const MATCHERS: &[Matcher] = &[
    Matcher {
        name: "position",
        data_types: b"!/=",
        decode: match_position,
    },
    Matcher {
        name: "object",
        data_types: b";",
        decode: match_object,
    },
    Matcher {
        name: "message",
        data_types: b":",
        decode: match_message,
    },
];

/// Decode one frame (binary AX.25 or a text line) into an event.
///
/// Suppressed messages come back as `AprsError::Filtered`.
pub fn decode_frame(frame: &[u8]) -> Result<Event> {
    let header = parse_header(frame)?;
    decode_payload(&header.source, header.payload)
}

/// Decode a payload already separated from its header.
pub fn decode_payload(source: &StationId, payload: &[u8]) -> Result<Event> {
    let &dti = payload
        .first()
        .ok_or_else(|| AprsError::FieldFormat("empty payload".into()))?;

    for matcher in MATCHERS.iter().filter(|m| m.data_types.contains(&dti)) {
        if let Some(result) = (matcher.decode)(source, payload) {
            return result;
        }
    }

    recover_position(source, payload)
}

/// Name of the matcher that claims `dti`, for diagnostics.
pub fn matcher_name(dti: u8) -> &'static str {
    MATCHERS
        .iter()
        .find(|m| m.data_types.contains(&dti))
        .map(|m| m.name)
        .unwrap_or("recovery")
}

// ---------------------------------------------------------------------------
// Matchers
// ---------------------------------------------------------------------------

fn match_position(source: &StationId, payload: &[u8]) -> Option<Result<Event>> {
    Some(parse_position(payload).map(|fields| position_event(source, fields, None)))
}

fn match_object(source: &StationId, payload: &[u8]) -> Option<Result<Event>> {
    // Not a well-formed object: let the recovery scan have a look.
    let (object, fields) = parse_object(payload).ok()?;
    Some(Ok(position_event(source, fields, Some(object))))
}

fn match_message(source: &StationId, payload: &[u8]) -> Option<Result<Event>> {
    let result = parse_message(payload).and_then(|fields| {
        let report = MessageReport {
            source: source.clone(),
            to: fields.to,
            text: fields.text,
            id: fields.id,
        };
        match noise::classify_message(&report) {
            Some(reason) => Err(AprsError::Filtered(reason)),
            None => Ok(Event::Message(report)),
        }
    });
    Some(result)
}

/// Last resort for frames without a usable data type identifier.
fn recover_position(source: &StationId, payload: &[u8]) -> Result<Event> {
    let window = &payload[..payload.len().min(RECOVERY_SCAN_LIMIT)];
    match window.iter().position(|&b| b == b'!') {
        Some(idx) if idx > 0 => {
            let fields = parse_position(&payload[idx..])?;
            Ok(position_event(source, fields, None))
        }
        _ => Err(AprsError::UnsupportedFormat(payload[0] as char)),
    }
}

fn position_event(
    source: &StationId,
    fields: PositionFields,
    object: Option<ObjectInfo>,
) -> Event {
    Event::Position(PositionReport {
        source: source.clone(),
        lat: fields.lat,
        lon: fields.lon,
        symbol_table: fields.symbol_table,
        symbol: fields.symbol,
        comment: fields.comment,
        object,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
