//! APRS-IS text relay client.
//!
//! Logs in with the station's credential and a range filter around its
//! grid square, then decodes every TNC2 line the server sends.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{info, trace, warn};

use aprs_core::config::Config;
use aprs_core::passcode;
use aprs_core::{gridlocator_to_lonlat, Event};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// How long the server gets to answer the login line.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const CLIENT_NAME: &str = "aprs-decode";

/// Used when the station has no usable grid square.
const FALLBACK_CENTER: (f64, f64) = (41.5, -81.0);

/// What the server granted us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Authenticated,
    ReadOnly,
}

/// One line from the server, classified.
#[derive(Debug, PartialEq)]
pub enum ServerLine<'a> {
    /// `# ...` banner or keepalive.
    Comment,
    LoginResponse(LoginState),
    Data(&'a [u8]),
}

/// Credential to send: the configured passcode if it matches the hash,
/// otherwise `-1` (receive only).
pub fn effective_passcode(callsign: &str, configured: Option<i32>) -> i32 {
    match configured {
        Some(code) if passcode::verify(callsign, code) => code,
        Some(_) => {
            warn!("Passcode does not match {callsign}, logging in read-only");
            -1
        }
        None => {
            warn!("No passcode configured for {callsign}, logging in read-only");
            -1
        }
    }
}

/// `r/lat/lon/km` range filter centered on the station's grid square.
///
/// Without a valid grid square the filter widens to twice the radius
/// around a fixed default center.
pub fn range_filter(gridsquare: Option<&str>, radius_km: u32) -> String {
    match gridsquare.map(gridlocator_to_lonlat) {
        Some(Ok((lon, lat))) => format!("r/{lat:.3}/{lon:.3}/{radius_km}"),
        other => {
            if let Some(Err(e)) = other {
                warn!("Ignoring grid square: {e}");
            }
            let (lat, lon) = FALLBACK_CENTER;
            format!("r/{lat:.3}/{lon:.3}/{}", radius_km * 2)
        }
    }
}

/// Build the login line sent right after connecting.
pub fn build_login_command(callsign: &str, passcode: i32, filter: &str) -> String {
    format!(
        "user {callsign} pass {passcode} vers {CLIENT_NAME} {} filter {filter}\r\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Classify a trimmed server line.
///
/// `sent_passcode` is what went out in the login line: a `verified`
/// response only counts when a real passcode was sent. A `# logresp`
/// addressed to another identifier is an error.
pub fn parse_server_line<'a>(
    line: &'a [u8],
    callsign: &str,
    sent_passcode: i32,
) -> Result<ServerLine<'a>> {
    if line.first() != Some(&b'#') {
        return Ok(ServerLine::Data(line));
    }

    let text = String::from_utf8_lossy(line);
    let mut words = text[1..].split_whitespace();
    if words.next() != Some("logresp") {
        return Ok(ServerLine::Comment);
    }

    let id = words.next().unwrap_or_default();
    if !id.eq_ignore_ascii_case(callsign) {
        bail!("login response for {id:?}, expected {callsign}");
    }

    let status = words.next().unwrap_or_default().trim_end_matches(',');
    let state = match status {
        "verified" if sent_passcode != -1 => LoginState::Authenticated,
        "verified" | "unverified" | "invalid" => LoginState::ReadOnly,
        other => {
            warn!("Unknown login status {other:?}, assuming read-only");
            LoginState::ReadOnly
        }
    };
    Ok(ServerLine::LoginResponse(state))
}

/// Connect, log in, and forward decoded events until the server hangs up.
pub async fn run(config: &Config, tx: mpsc::Sender<Event>) -> Result<()> {
    let callsign = config.station.callsign.as_str();
    let server = config.aprsis.server.as_str();

    info!("Connecting to APRS-IS server {server}");
    let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(server))
        .await
        .with_context(|| format!("timed out connecting to {server}"))?
        .with_context(|| format!("cannot connect to {server}"))?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let pass = effective_passcode(callsign, config.station.passcode);
    let filter = range_filter(config.station.gridsquare.as_deref(), config.aprsis.radius_km);
    info!("Using APRS filter: {filter}");
    writer
        .write_all(build_login_command(callsign, pass, &filter).as_bytes())
        .await
        .context("failed to send login")?;
    writer.flush().await?;

    read_session(&mut reader, callsign, pass, &tx).await
}

/// Handle server lines until EOF or until the consumer goes away.
///
/// The login response (or the first data line) must arrive within
/// `LOGIN_TIMEOUT` of the session starting.
pub async fn read_session<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    callsign: &str,
    sent_passcode: i32,
    tx: &mpsc::Sender<Event>,
) -> Result<()> {
    let login_deadline = Instant::now() + LOGIN_TIMEOUT;
    let mut login: Option<LoginState> = None;
    let mut buf = Vec::with_capacity(512);

    loop {
        buf.clear();
        let n = if login.is_none() {
            timeout_at(login_deadline, reader.read_until(b'\n', &mut buf))
                .await
                .context("no login response from server")??
        } else {
            reader.read_until(b'\n', &mut buf).await?
        };
        if n == 0 {
            info!("APRS-IS connection closed by server");
            return Ok(());
        }
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match parse_server_line(line, callsign, sent_passcode)? {
            ServerLine::Comment => trace!("server: {}", String::from_utf8_lossy(line)),
            ServerLine::LoginResponse(state) => {
                log_login(state);
                login = Some(state);
            }
            ServerLine::Data(data) => {
                if login.is_none() {
                    warn!("Data before login response, assuming read-only");
                    login = Some(LoginState::ReadOnly);
                }
                trace!("rx: {}", String::from_utf8_lossy(data));
                if !crate::forward(data, tx).await {
                    return Ok(());
                }
            }
        }
    }
}

fn log_login(state: LoginState) {
    match state {
        LoginState::Authenticated => info!("Logged in to APRS-IS (verified)"),
        LoginState::ReadOnly => warn!("Logged in to APRS-IS read-only"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
