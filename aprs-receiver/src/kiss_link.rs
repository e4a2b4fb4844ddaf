//! Live KISS TNC link over TCP or a serial port.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, trace};

use aprs_core::config::InterfaceConfig;
use aprs_core::kiss::{split_command, Frame, KissDecoder};
use aprs_core::{AprsError, Event};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_CHUNK: usize = 1024;

/// Async counterpart of `aprs_core::KissReader`, fed by the same decoder.
pub struct AsyncKissReader<R> {
    inner: R,
    decoder: KissDecoder,
    pending: VecDeque<Frame>,
    buf: Box<[u8; READ_CHUNK]>,
}

impl<R: AsyncRead + Unpin> AsyncKissReader<R> {
    pub fn new(inner: R) -> Self {
        AsyncKissReader {
            inner,
            decoder: KissDecoder::new(),
            pending: VecDeque::new(),
            buf: Box::new([0u8; READ_CHUNK]),
        }
    }

    /// Next complete frame (command byte included).
    ///
    /// A closed stream is `AprsError::EndOfStream`.
    pub async fn next_frame(&mut self) -> Result<Frame, AprsError> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }
            let n = self.inner.read(&mut self.buf[..]).await?;
            if n == 0 {
                return Err(AprsError::EndOfStream);
            }
            self.pending.extend(self.decoder.push(&self.buf[..n]));
        }
    }
}

/// `host:port` addresses a TCP TNC; anything else is a serial device.
pub fn is_tcp_address(device: &str) -> bool {
    match device.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains('/') && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

type Link = Box<dyn AsyncRead + Unpin + Send>;

async fn open(interface: &InterfaceConfig) -> Result<Link> {
    if is_tcp_address(&interface.device) {
        info!("Connecting to KISS TNC at {}", interface.device);
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&interface.device))
            .await
            .with_context(|| format!("timed out connecting to {}", interface.device))?
            .with_context(|| format!("cannot connect to {}", interface.device))?;
        Ok(Box::new(stream))
    } else {
        info!(
            "Opening serial TNC {} at {} baud",
            interface.device, interface.baud
        );
        let port = tokio_serial::new(&interface.device, interface.baud)
            .open_native_async()
            .with_context(|| format!("cannot open serial port {}", interface.device))?;
        Ok(Box::new(port))
    }
}

/// Read frames until the link closes, forwarding decoded events.
pub async fn run(interface: &InterfaceConfig, tx: mpsc::Sender<Event>) -> Result<()> {
    let link = open(interface).await?;
    let mut reader = AsyncKissReader::new(link);
    info!("KISS link up");

    loop {
        let frame = match reader.next_frame().await {
            Ok(f) => f,
            Err(e) if e.is_terminal() => {
                info!("KISS link closed: {e}");
                return Ok(());
            }
            Err(e) => {
                debug!("framing: {e}");
                continue;
            }
        };

        let Some((port, ax25)) = split_command(&frame) else {
            trace!("skipping non-data KISS frame ({} bytes)", frame.len());
            continue;
        };
        trace!(port, len = ax25.len(), "frame");

        if !crate::forward(ax25, &tx).await {
            return Ok(());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use aprs_core::ax25::build_ui_frame;
    use aprs_core::kiss::{encode_data_frame, FEND};

    #[test]
    fn test_is_tcp_address() {
        assert!(is_tcp_address("127.0.0.1:8001"));
        assert!(is_tcp_address("tnc.local:8001"));
        assert!(!is_tcp_address("/dev/ttyUSB0"));
        assert!(!is_tcp_address("COM3"));
        assert!(!is_tcp_address(":8001"));
        assert!(!is_tcp_address("host:port"));
    }

    #[tokio::test]
    async fn test_async_reader_frames() {
        let ax25 = build_ui_frame("APRS", "N0CALL", &[], b"!4903.50N/07201.75W-");
        let mut data = vec![FEND, FEND];
        data.extend(encode_data_frame(0, &ax25));
        data.extend(encode_data_frame(2, &ax25));

        let mut reader = AsyncKissReader::new(&data[..]);
        let first = reader.next_frame().await.unwrap();
        assert_eq!(split_command(&first), Some((0, &ax25[..])));
        let second = reader.next_frame().await.unwrap();
        assert_eq!(split_command(&second), Some((2, &ax25[..])));
        assert!(reader.next_frame().await.unwrap_err().is_terminal());
    }

    #[tokio::test]
    async fn test_async_reader_partial_frame_at_eof() {
        let data = [FEND, 0x00, 0x41, 0x42];
        let mut reader = AsyncKissReader::new(&data[..]);
        assert!(reader.next_frame().await.unwrap_err().is_terminal());
    }
}
