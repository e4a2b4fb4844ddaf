//! aprs-feeder: offline decoding of captured APRS traffic.
//!
//! Supports:
//! - Decoding KISS byte captures and TNC2 text logs into events
//! - Computing relay passcodes and Maidenhead grid centers
//! - Writing a default config file

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use aprs_core::ax25::parse_header;
use aprs_core::config::{self, Config};
use aprs_core::coord::{format_latitude, format_longitude};
use aprs_core::decode::matcher_name;
use aprs_core::{decode_frame, gridlocator_to_lonlat, login_credential, Event, StationId};

mod capture;

use capture::CaptureFormat;

#[derive(Parser)]
#[command(
    name = "aprs-feeder",
    version,
    about = "Decode captured APRS traffic"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a KISS capture or TNC2 text log
    Decode {
        /// Capture file, or `-` for stdin
        file: PathBuf,

        /// Input layout (detected from the first byte when omitted)
        #[arg(long, value_enum)]
        format: Option<CaptureFormat>,

        /// Print one JSON event per line instead of the summary table
        #[arg(long)]
        raw: bool,
    },
    /// Compute the relay login passcode for a callsign
    Passcode {
        callsign: String,
    },
    /// Show the center of a Maidenhead grid square
    Grid {
        locator: String,
    },
    /// Write a default config file to ~/.aprs-decode/config.yaml
    Config {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode { file, format, raw } => cmd_decode(file, format, raw),
        Commands::Passcode { callsign } => cmd_passcode(&callsign),
        Commands::Grid { locator } => cmd_grid(&locator),
        Commands::Config { force } => cmd_config(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// decode
// ---------------------------------------------------------------------------

/// Per-station tallies for the summary table.
#[derive(Debug, Default)]
struct StationState {
    positions: u64,
    messages: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    last_comment: Option<String>,
}

impl StationState {
    fn update(&mut self, event: &Event) {
        match event {
            Event::Position(p) => {
                self.positions += 1;
                self.lat = Some(p.lat);
                self.lon = Some(p.lon);
                if !p.comment.is_empty() {
                    self.last_comment = Some(p.comment.clone());
                }
            }
            Event::Message(_) => self.messages += 1,
        }
    }

    fn total(&self) -> u64 {
        self.positions + self.messages
    }
}

/// Counters across one capture.
#[derive(Debug, Default)]
struct DecodeStats {
    frames: u64,
    decoded: u64,
    filtered: u64,
    failed: u64,
}

fn cmd_decode(file: PathBuf, format: Option<CaptureFormat>, raw: bool) -> Result<()> {
    let data = capture::read_input(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let format = format.unwrap_or_else(|| capture::detect_format(&data));
    info!(file = %file.display(), ?format, bytes = data.len(), "decoding capture");

    let frames = capture::frames(&data, format)?;
    let mut stations: HashMap<StationId, StationState> = HashMap::new();
    let mut stats = DecodeStats::default();

    for frame in &frames {
        stats.frames += 1;
        match decode_frame(frame) {
            Ok(event) => {
                stats.decoded += 1;
                if raw {
                    println!("{}", serde_json::to_string(&event)?);
                }
                stations
                    .entry(event.source().clone())
                    .or_default()
                    .update(&event);
            }
            Err(e) if e.is_filtered() => {
                stats.filtered += 1;
                debug!("dropped: {e}");
            }
            Err(e) => {
                stats.failed += 1;
                let dti = payload_dti(frame);
                debug!(matcher = dti.map(matcher_name).unwrap_or("-"), "undecoded: {e}");
            }
        }
    }

    if stats.frames == 0 {
        warn!("no frames found in {}", file.display());
    }

    if raw {
        info!(
            frames = stats.frames,
            decoded = stats.decoded,
            filtered = stats.filtered,
            failed = stats.failed,
            "done"
        );
    } else {
        print_summary(&stations, &stats);
    }
    Ok(())
}

/// Data type byte of the payload, for log context. `None` when the header
/// itself does not parse or the payload is empty.
fn payload_dti(frame: &[u8]) -> Option<u8> {
    parse_header(frame).ok()?.payload.first().copied()
}

fn summary_line(stations: &HashMap<StationId, StationState>, stats: &DecodeStats) -> String {
    format!(
        "Frames: {} parsed, {} decoded, {} filtered, {} failed, {} stations",
        stats.frames,
        stats.decoded,
        stats.filtered,
        stats.failed,
        stations.len()
    )
}

fn print_summary(stations: &HashMap<StationId, StationState>, stats: &DecodeStats) {
    println!();
    println!("{}", summary_line(stations, stats));
    println!();

    if stations.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Station", "Positions", "Messages", "Lat", "Lon", "Comment",
    ]);

    let mut sorted: Vec<_> = stations.iter().collect();
    sorted.sort_by(|a, b| b.1.total().cmp(&a.1.total()).then_with(|| a.0.cmp(b.0)));

    for (id, st) in sorted {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(st.positions),
            Cell::new(st.messages),
            Cell::new(st.lat.map(format_latitude).unwrap_or("-".into())),
            Cell::new(st.lon.map(format_longitude).unwrap_or("-".into())),
            Cell::new(st.last_comment.as_deref().unwrap_or("-")),
        ]);
    }

    println!("{table}");
}

// ---------------------------------------------------------------------------
// passcode / grid / config
// ---------------------------------------------------------------------------

fn cmd_passcode(callsign: &str) -> Result<()> {
    let code = login_credential(callsign)?;
    println!("{} {code}", callsign.to_ascii_uppercase());
    Ok(())
}

fn cmd_grid(locator: &str) -> Result<()> {
    let (lon, lat) = gridlocator_to_lonlat(locator)?;
    println!(
        "{locator}: {lat:.6} {lon:.6} ({} {})",
        format_latitude(lat),
        format_longitude(lon)
    );
    Ok(())
}

fn cmd_config(force: bool) -> Result<()> {
    let path = config::config_file();
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let path = config::save_config(&Config::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use aprs_core::ax25::build_ui_frame;

    #[test]
    fn test_station_state_update() {
        let mut st = StationState::default();
        st.update(&decode_frame(b"N0CALL>APRS:!4903.50N/07201.75W-Mobile").unwrap());
        st.update(&decode_frame(b"N0CALL>APRS::KD9XYZ   :hi").unwrap());
        st.update(&decode_frame(b"N0CALL>APRS:=4903.60N/07201.75W-").unwrap());

        assert_eq!(st.positions, 2);
        assert_eq!(st.messages, 1);
        assert_eq!(st.total(), 3);
        assert!((st.lat.unwrap() - 49.06).abs() < 1e-6);
        // Empty comment keeps the previous one
        assert_eq!(st.last_comment.as_deref(), Some("Mobile"));
    }

    #[test]
    fn test_payload_dti() {
        assert_eq!(payload_dti(b"N0CALL>APRS:>status"), Some(b'>'));
        assert_eq!(payload_dti(b"N0CALL>APRS:"), None);
        assert_eq!(payload_dti(b"no colon"), None);
    }

    #[test]
    fn test_payload_dti_binary_frame() {
        // The colon in the comment must not be mistaken for a header end
        let frame = build_ui_frame("APRS", "N0CALL", &[], b"TNC junk at 20:00");
        assert_eq!(payload_dti(&frame), Some(b'T'));
        assert_eq!(matcher_name(payload_dti(&frame).unwrap()), "recovery");
    }

    #[test]
    fn test_summary_line_counts_failures() {
        let stats = DecodeStats {
            frames: 5,
            decoded: 2,
            filtered: 1,
            failed: 2,
        };
        let mut stations = HashMap::new();
        stations.insert(StationId::new("N0CALL"), StationState::default());
        assert_eq!(
            summary_line(&stations, &stats),
            "Frames: 5 parsed, 2 decoded, 1 filtered, 2 failed, 1 stations"
        );
    }
}
