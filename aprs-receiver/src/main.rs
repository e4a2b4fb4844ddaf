//! aprs-receiver: live APRS receiver daemon.
//!
//! Reads from a KISS TNC (TCP or serial) or the APRS-IS relay, decodes on
//! a dedicated task, and prints one JSON event per line on stdout.
//! Message events are optionally forwarded to a webhook.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use aprs_core::config::{self, Config, InterfaceKind};
use aprs_core::{decode_frame, Event};

mod aprsis;
mod kiss_link;
mod webhook;

use webhook::WebhookDispatcher;

#[derive(Parser)]
#[command(
    name = "aprs-receiver",
    version,
    about = "Live APRS receiver: KISS TNC or APRS-IS in, JSON events out"
)]
struct Cli {
    /// Config file (default: ~/.aprs-decode/config.yaml)
    #[arg(long, env = "APRS_CONFIG")]
    config: Option<PathBuf>,

    /// Data source: kiss or aprsis
    #[arg(long, env = "APRS_INTERFACE")]
    interface: Option<String>,

    /// KISS device: host:port for TCP, otherwise a serial port path
    #[arg(long, env = "APRS_DEVICE")]
    device: Option<String>,

    /// Serial baud rate
    #[arg(long, env = "APRS_BAUD")]
    baud: Option<u32>,

    /// Station callsign with optional SSID
    #[arg(long, env = "APRS_CALLSIGN")]
    callsign: Option<String>,

    /// APRS-IS passcode
    #[arg(long, env = "APRS_PASSCODE", allow_hyphen_values = true)]
    passcode: Option<i32>,

    /// Maidenhead grid square for the APRS-IS range filter
    #[arg(long, env = "APRS_GRIDSQUARE")]
    gridsquare: Option<String>,

    /// APRS-IS server host:port
    #[arg(long, env = "APRS_SERVER")]
    server: Option<String>,

    /// APRS-IS filter radius in km
    #[arg(long, env = "APRS_RADIUS_KM")]
    radius_km: Option<u32>,

    /// Webhook URL for message events
    #[arg(long, env = "APRS_WEBHOOK")]
    webhook: Option<String>,

    /// Decoded event queue depth
    #[arg(long, default_value = "256")]
    queue: usize,
}

impl Cli {
    /// Load the config file and apply command-line overrides on top.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => config::load_config_from(path),
            None => config::load_config(),
        };

        if let Some(kind) = &self.interface {
            config.interface.kind = InterfaceKind::parse(kind)
                .with_context(|| format!("unknown interface {kind:?} (expected kiss or aprsis)"))?;
        }
        if let Some(device) = &self.device {
            config.interface.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.interface.baud = baud;
        }
        if let Some(call) = &self.callsign {
            config.station.callsign = call.to_ascii_uppercase();
        }
        if self.passcode.is_some() {
            config.station.passcode = self.passcode;
        }
        if self.gridsquare.is_some() {
            config.station.gridsquare = self.gridsquare.clone();
        }
        if let Some(server) = &self.server {
            config.aprsis.server = server.clone();
        }
        if let Some(radius) = self.radius_km {
            config.aprsis.radius_km = radius;
        }
        if self.webhook.is_some() {
            config.webhook = self.webhook.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    info!(
        callsign = %config.station.callsign,
        interface = config.interface.kind.as_str(),
        "aprs-receiver starting"
    );

    let (tx, mut rx) = mpsc::channel::<Event>(cli.queue.max(1));
    let webhook = config.webhook.as_deref().map(WebhookDispatcher::new);

    let reader_config = config.clone();
    let reader = tokio::spawn(async move {
        match reader_config.interface.kind {
            InterfaceKind::Kiss => kiss_link::run(&reader_config.interface, tx).await,
            InterfaceKind::AprsIs => aprsis::run(&reader_config, tx).await,
        }
    });

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => emit(&event, webhook.as_ref())?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                reader.abort();
                return Ok(());
            }
        }
    }

    // Channel closed: the reader finished, surface its result.
    match reader.await {
        Ok(result) => result,
        Err(e) => Err(e).context("reader task failed"),
    }
}

/// Print one event as a JSON line and forward messages to the webhook.
fn emit(event: &Event, webhook: Option<&WebhookDispatcher>) -> Result<()> {
    println!("{}", serde_json::to_string(event)?);
    if let (Event::Message(m), Some(wh)) = (event, webhook) {
        wh.notify(m);
    }
    Ok(())
}

/// Decode one frame and queue the event.
///
/// Undecodable and filtered frames are dropped. Returns false once the
/// consumer has gone away.
pub(crate) async fn forward(frame: &[u8], tx: &mpsc::Sender<Event>) -> bool {
    match decode_frame(frame) {
        Ok(event) => tx.send(event).await.is_ok(),
        Err(e) => {
            debug!("dropped frame: {e}");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file_config = Config::default();
        file_config.station.callsign = "N0CALL".into();
        file_config.aprsis.radius_km = 50;
        config::save_config_to(&file_config, &path).unwrap();

        let cli = Cli::parse_from([
            "aprs-receiver",
            "--config",
            path.to_str().unwrap(),
            "--interface",
            "aprsis",
            "--callsign",
            "kd9xyz-7",
            "--passcode",
            "-1",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.interface.kind, InterfaceKind::AprsIs);
        assert_eq!(config.station.callsign, "KD9XYZ-7");
        assert_eq!(config.station.passcode, Some(-1));
        assert_eq!(config.aprsis.radius_km, 50);
    }

    #[test]
    fn test_unknown_interface_rejected() {
        let cli = Cli::parse_from(["aprs-receiver", "--interface", "pigeon"]);
        assert!(cli.resolve_config().is_err());
    }

    #[tokio::test]
    async fn test_forward_decodes_and_drops() {
        let (tx, mut rx) = mpsc::channel(4);
        assert!(forward(b"N0CALL>APRS:!4903.50N/07201.75W-", &tx).await);
        assert!(forward(b"N0CALL>APRS:>status", &tx).await);
        assert!(forward(b"NWSBOT>APRS::KD9XYZ   :warning", &tx).await);
        drop(tx);

        let event = rx.recv().await.unwrap();
        assert!(event.position().is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forward_reports_closed_consumer() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(!forward(b"N0CALL>APRS:!4903.50N/07201.75W-", &tx).await);
    }
}
