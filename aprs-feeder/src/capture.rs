//! Capture file input for offline decoding.
//!
//! Input modes:
//! - `Kiss`: raw bytes as captured from a TNC (FEND-delimited KISS frames)
//! - `Text`: relay / TNC2 monitor logs, one `SOURCE>DEST,PATH:payload` per line
//!
//! Both produce a list of frames ready for `aprs_core::decode_frame`.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use aprs_core::kiss::{self, KissReader, FEND};

/// Capture file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CaptureFormat {
    Kiss,
    Text,
}

/// Guess the format from the first bytes of a capture.
pub fn detect_format(head: &[u8]) -> CaptureFormat {
    match head.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(&FEND) => CaptureFormat::Kiss,
        _ => CaptureFormat::Text,
    }
}

/// Read the whole capture from a path, or stdin for `-`.
pub fn read_input(path: &Path) -> io::Result<Vec<u8>> {
    if path.to_str() == Some("-") {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        fs::read(path)
    }
}

/// Split a capture into decodable frames.
pub fn frames(data: &[u8], format: CaptureFormat) -> io::Result<Vec<Vec<u8>>> {
    match format {
        CaptureFormat::Kiss => kiss_frames(data),
        CaptureFormat::Text => text_frames(data),
    }
}

/// KISS data frames with the command byte removed. TNC parameter frames
/// are skipped.
fn kiss_frames(data: &[u8]) -> io::Result<Vec<Vec<u8>>> {
    let mut reader = KissReader::new(data);
    let mut out = Vec::new();
    loop {
        match reader.next_frame() {
            Ok(frame) => {
                if let Some((_port, ax25)) = kiss::split_command(&frame) {
                    out.push(ax25.to_vec());
                }
            }
            Err(e) if e.is_terminal() => break,
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }
    Ok(out)
}

/// Non-empty, non-comment lines with line endings stripped.
fn text_frames(data: &[u8]) -> io::Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    for line in data.split(|&b| b == b'\n') {
        if let Some(clean) = clean_line(line) {
            out.push(clean.to_vec());
        }
    }
    Ok(out)
}

/// Trim a log line; `None` for blanks and `#` server comments.
pub fn clean_line(line: &[u8]) -> Option<&[u8]> {
    let line = line.trim_ascii();
    if line.is_empty() || line[0] == b'#' {
        return None;
    }
    Some(line)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use aprs_core::ax25::build_ui_frame;
    use aprs_core::kiss::{encode_data_frame, encode_frame};

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(&[FEND, 0x00]), CaptureFormat::Kiss);
        assert_eq!(detect_format(b"\n\xC0\x00"), CaptureFormat::Kiss);
        assert_eq!(detect_format(b"N0CALL>APRS:!"), CaptureFormat::Text);
        assert_eq!(detect_format(b""), CaptureFormat::Text);
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line(b"  N0CALL>APRS:x\r"), Some(&b"N0CALL>APRS:x"[..]));
        assert!(clean_line(b"# aprsc 2.1.19").is_none());
        assert!(clean_line(b"   ").is_none());
    }

    #[test]
    fn test_text_frames() {
        let data = b"# logresp N0CALL unverified\nN0CALL>APRS:!x\r\n\nK1ABC>APRS:>hi\n";
        let frames = frames(data, CaptureFormat::Text).unwrap();
        assert_eq!(frames, vec![b"N0CALL>APRS:!x".to_vec(), b"K1ABC>APRS:>hi".to_vec()]);
    }

    #[test]
    fn test_kiss_frames_strip_command() {
        let ax25 = build_ui_frame("APRS", "N0CALL", &[], b"!x");
        let mut data = encode_data_frame(0, &ax25);
        // TXDELAY parameter frame is dropped
        data.extend(encode_frame(&[0x01, 0x32]));
        data.extend(encode_data_frame(1, &ax25));

        let frames = frames(&data, CaptureFormat::Kiss).unwrap();
        assert_eq!(frames, vec![ax25.clone(), ax25]);
    }
}
