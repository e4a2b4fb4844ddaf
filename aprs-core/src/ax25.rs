//! Extract the source station and payload from a frame.
//!
//! Two header forms are accepted:
//! - Binary AX.25: 7-byte shifted-ASCII address fields, then control + PID
//! - Text (TNC2 / relay feed): `SOURCE>DEST,PATH:payload`
//!
//! The form is auto-detected: a frame with a `:` whose identifier (the
//! bytes before the first `>`) is printable ASCII is text, anything else is
//! binary. Binary frames always fail that test because the control byte
//! sits between the address fields and the first possible `>` or `:`.
//! A text line with no `:` is handed to the binary parser, which normally
//! rejects it.

use crate::types::{AprsError, Result, StationId};

/// Unnumbered Information frame control field.
pub const CONTROL_UI: u8 = 0x03;
/// "No layer 3 protocol" PID.
pub const PID_NO_LAYER3: u8 = 0xF0;

const ADDR_LEN: usize = 7;
/// Destination + source + control + PID.
pub const MIN_FRAME_LEN: usize = 2 * ADDR_LEN + 2;
/// Destination, source and at most 8 digipeaters.
const MAX_ADDRESSES: usize = 10;
/// Longest source identifier accepted in a text header.
pub const MAX_TEXT_ID_LEN: usize = 9;

/// SSID byte: "last address" marker.
const ADDR_LAST: u8 = 0x01;
/// SSID byte: "has been repeated" bit on digipeater fields.
const ADDR_REPEATED: u8 = 0x80;

/// Parsed frame header. `payload` borrows from the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Header<'a> {
    pub source: StationId,
    pub destination: Option<StationId>,
    /// Digipeater path; repeated hops are marked with a trailing `*`.
    pub path: Vec<String>,
    pub payload: &'a [u8],
}

/// Parse either header form.
pub fn parse_header(frame: &[u8]) -> Result<Header<'_>> {
    match text_header_end(frame) {
        Some(colon) => parse_text(frame, colon),
        None => parse_binary(frame),
    }
}

/// Index of the first `:` if the identifier before it is printable ASCII.
///
/// Only the identifier is checked; relay paths may carry other bytes.
fn text_header_end(frame: &[u8]) -> Option<usize> {
    let colon = frame.iter().position(|&b| b == b':')?;
    let id_end = frame[..colon]
        .iter()
        .position(|&b| b == b'>')
        .unwrap_or(colon);
    frame[..id_end]
        .iter()
        .all(|b| b.is_ascii_graphic() || *b == b' ')
        .then_some(colon)
}

// ---------------------------------------------------------------------------
// Text form
// ---------------------------------------------------------------------------

fn parse_text(frame: &[u8], colon: usize) -> Result<Header<'_>> {
    let header = &frame[..colon];
    let payload = &frame[colon + 1..];

    let gt = header.iter().position(|&b| b == b'>').ok_or_else(|| {
        AprsError::Header(format!(
            "no source separator '>' in {:?}",
            String::from_utf8_lossy(header)
        ))
    })?;
    // Printable ASCII was checked by the caller.
    let source = std::str::from_utf8(&header[..gt])
        .map_err(|_| AprsError::Header("source identifier is not ASCII".into()))?;
    let route = String::from_utf8_lossy(&header[gt + 1..]);

    if source.is_empty() {
        return Err(AprsError::Header("empty source identifier".into()));
    }
    if source.len() > MAX_TEXT_ID_LEN {
        return Err(AprsError::Header(format!(
            "source identifier too long: {source:?}"
        )));
    }

    let mut hops = route.split(',');
    let destination = hops
        .next()
        .filter(|d| !d.is_empty())
        .map(StationId::new);
    let path = hops.filter(|h| !h.is_empty()).map(str::to_string).collect();

    Ok(Header {
        source: StationId::new(source),
        destination,
        path,
        payload,
    })
}

// ---------------------------------------------------------------------------
// Binary form
// ---------------------------------------------------------------------------

fn parse_binary(frame: &[u8]) -> Result<Header<'_>> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(AprsError::Header(format!(
            "frame too short for AX.25: {} bytes",
            frame.len()
        )));
    }

    let source = decode_address(&frame[ADDR_LEN..2 * ADDR_LEN])
        .map_err(|e| AprsError::Header(format!("invalid source address: {e}")))?
        .0;
    let destination = decode_address(&frame[..ADDR_LEN]).ok().map(|(id, _)| id);

    // Walk digipeater fields until an SSID byte carries the last-address bit.
    let mut end = 2 * ADDR_LEN;
    let mut fields = 2;
    let mut path = Vec::new();
    while frame[end - 1] & ADDR_LAST == 0 {
        if fields >= MAX_ADDRESSES {
            return Err(AprsError::Header(
                "no end of address path within 10 fields".into(),
            ));
        }
        if end + ADDR_LEN > frame.len() {
            return Err(AprsError::Header(
                "address path runs past end of frame".into(),
            ));
        }
        if let Ok((hop, repeated)) = decode_address(&frame[end..end + ADDR_LEN]) {
            path.push(if repeated {
                format!("{hop}*")
            } else {
                hop.to_string()
            });
        }
        end += ADDR_LEN;
        fields += 1;
    }

    if end + 2 > frame.len() {
        return Err(AprsError::Header(
            "missing control/PID after address path".into(),
        ));
    }
    let control = frame[end];
    if control != CONTROL_UI {
        return Err(AprsError::Header(format!(
            "not a UI frame (control 0x{control:02X})"
        )));
    }
    // PID is not checked: TNCs in the field send all sorts of values here.

    let payload = strip_embedded_header(&frame[end + 2..]);

    Ok(Header {
        source,
        destination,
        path,
        payload,
    })
}

/// Drop a `CALL>PATH:` prefix that some digipeaters leave inside the payload.
///
/// Only stripped when the text before the first `:` contains a `>`.
fn strip_embedded_header(payload: &[u8]) -> &[u8] {
    match payload.iter().position(|&b| b == b':') {
        Some(colon) if payload[..colon].contains(&b'>') => &payload[colon + 1..],
        _ => payload,
    }
}

/// Decode one 7-byte address field into `(station, repeated)`.
///
/// Bytes outside printable ASCII are skipped and a NUL ends the call.
pub fn decode_address(field: &[u8]) -> Result<(StationId, bool)> {
    if field.len() != ADDR_LEN {
        return Err(AprsError::Header(format!(
            "address field is {} bytes, expected 7",
            field.len()
        )));
    }

    let mut call = String::with_capacity(6);
    for &b in &field[..6] {
        let c = b >> 1;
        if c == 0 {
            break;
        }
        if !(b' '..=b'~').contains(&c) || c == b' ' {
            continue;
        }
        call.push(c as char);
    }
    if call.is_empty() {
        return Err(AprsError::Header("decoded callsign is empty".into()));
    }

    let ssid_byte = field[6];
    let ssid = (ssid_byte >> 1) & 0x0F;
    Ok((
        StationId::from_parts(&call, ssid),
        ssid_byte & ADDR_REPEATED != 0,
    ))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `CALL[-SSID]` as a 7-byte address field.
pub fn encode_address(id: &str, last: bool) -> [u8; ADDR_LEN] {
    let (call, ssid) = match id.split_once('-') {
        Some((call, ssid)) => (call, ssid.parse::<u8>().unwrap_or(0) & 0x0F),
        None => (id, 0),
    };

    let mut field = [b' ' << 1; ADDR_LEN];
    for (slot, c) in field.iter_mut().zip(call.bytes().take(6)) {
        *slot = c.to_ascii_uppercase() << 1;
    }
    field[6] = 0x60 | (ssid << 1) | if last { ADDR_LAST } else { 0 };
    field
}

/// Build a UI frame: addresses, control, PID, payload.
pub fn build_ui_frame(destination: &str, source: &str, path: &[&str], payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(MIN_FRAME_LEN + path.len() * ADDR_LEN + payload.len());
    frame.extend_from_slice(&encode_address(destination, false));
    frame.extend_from_slice(&encode_address(source, path.is_empty()));
    for (i, hop) in path.iter().enumerate() {
        frame.extend_from_slice(&encode_address(hop, i + 1 == path.len()));
    }
    frame.push(CONTROL_UI);
    frame.push(PID_NO_LAYER3);
    frame.extend_from_slice(payload);
    frame
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
