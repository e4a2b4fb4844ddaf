//! KISS framing: recover link-layer frames from an escaped byte stream.
//!
//! Responsibilities:
//! - Split the stream on FEND delimiters
//! - Undo FESC/TFEND and FESC/TFESC escapes (other escaped bytes pass through)
//! - Skip empty frames produced by back-to-back FENDs
//! - Drop frames longer than `MAX_FRAME_LEN` and resync on the next FEND
//! - Separate the TNC command byte from the AX.25 bytes
//!
//! `KissDecoder` is a push-style state machine with no I/O. `KissReader`
//! drives it from any blocking `Read`; the receiver drives the same
//! decoder from an async socket.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::types::{AprsError, Result};

/// Frame End.
pub const FEND: u8 = 0xC0;
/// Frame Escape.
pub const FESC: u8 = 0xDB;
/// Transposed Frame End.
pub const TFEND: u8 = 0xDC;
/// Transposed Frame Escape.
pub const TFESC: u8 = 0xDD;

/// KISS command nibble for a data frame.
pub const CMD_DATA: u8 = 0x00;

/// Longest unescaped frame kept, command byte included. A full AX.25 UI
/// frame (10 addresses, control, PID, 256-byte info field) is well under.
pub const MAX_FRAME_LEN: usize = 1024;

/// One delimited unit of link-layer data.
pub type Frame = Vec<u8>;

// ---------------------------------------------------------------------------
// Decoder state machine
// ---------------------------------------------------------------------------

/// Incremental KISS decoder.
#[derive(Debug, Default)]
pub struct KissDecoder {
    buf: Vec<u8>,
    in_frame: bool,
    escaped: bool,
}

impl KissDecoder {
    pub fn new() -> Self {
        KissDecoder {
            buf: Vec::with_capacity(512),
            in_frame: false,
            escaped: false,
        }
    }

    /// Feed one byte. Returns a frame when this byte closes one.
    pub fn feed(&mut self, b: u8) -> Option<Frame> {
        if self.escaped {
            self.escaped = false;
            let unescaped = match b {
                TFEND => FEND,
                TFESC => FESC,
                // Protocol violation; keep the byte rather than drop the frame.
                other => other,
            };
            self.push_byte(unescaped);
            return None;
        }

        match b {
            FEND => {
                // A closing FEND also opens the next frame.
                let was_in_frame = self.in_frame;
                self.in_frame = true;
                if was_in_frame && !self.buf.is_empty() {
                    return Some(std::mem::take(&mut self.buf));
                }
                None
            }
            FESC => {
                if self.in_frame {
                    self.escaped = true;
                }
                None
            }
            _ => {
                if self.in_frame {
                    self.push_byte(b);
                }
                None
            }
        }
    }

    fn push_byte(&mut self, b: u8) {
        if self.buf.len() >= MAX_FRAME_LEN {
            // Runaway frame: throw it away and wait for the next FEND.
            self.reset();
            return;
        }
        self.buf.push(b);
    }

    /// Feed a chunk of bytes, returning every frame it completes.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        data.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Drop any partial frame and wait for the next FEND.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.in_frame = false;
        self.escaped = false;
    }
}

// ---------------------------------------------------------------------------
// Blocking reader
// ---------------------------------------------------------------------------

/// Reads whole KISS frames from a blocking byte source.
///
/// Must be driven by a single reader. Errors are never retried here: the
/// caller decides whether to reconnect.
pub struct KissReader<R> {
    inner: R,
    decoder: KissDecoder,
    pending: VecDeque<Frame>,
    chunk: Box<[u8]>,
}

impl<R: Read> KissReader<R> {
    pub fn new(inner: R) -> Self {
        KissReader {
            inner,
            decoder: KissDecoder::new(),
            pending: VecDeque::new(),
            chunk: vec![0u8; 1024].into_boxed_slice(),
        }
    }

    /// Block until a complete frame is available.
    ///
    /// End of input yields a terminal `Framing` error; read failures yield `Io`.
    pub fn next_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let n = match self.inner.read(&mut self.chunk) {
                Ok(0) => return Err(AprsError::EndOfStream),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            let frames = self.decoder.push(&self.chunk[..n]);
            self.pending.extend(frames);
        }
    }
}

// ---------------------------------------------------------------------------
// Command byte and encoding
// ---------------------------------------------------------------------------

/// Split the TNC command byte off a frame.
///
/// Returns `(port, ax25_bytes)` for data frames and `None` for TNC
/// parameter frames, which carry no link-layer data.
pub fn split_command(frame: &[u8]) -> Option<(u8, &[u8])> {
    let (&cmd, rest) = frame.split_first()?;
    if cmd & 0x0F != CMD_DATA || rest.is_empty() {
        return None;
    }
    Some((cmd >> 4, rest))
}

/// Escape `data` and wrap it in FEND delimiters.
pub fn encode_frame(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    out.push(FEND);
    for &b in data {
        match b {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            _ => out.push(b),
        }
    }
    out.push(FEND);
    out
}

/// Encode an AX.25 frame as a KISS data frame on `port`.
pub fn encode_data_frame(port: u8, ax25: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(ax25.len() + 1);
    data.push((port & 0x0F) << 4 | CMD_DATA);
    data.extend_from_slice(ax25);
    encode_frame(&data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
