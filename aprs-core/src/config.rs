//! Configuration file management for aprs-decode.
//!
//! Reads/writes `~/.aprs-decode/config.yaml` with station identity, the
//! modem interface, relay server settings, and webhook URL.

use std::path::{Path, PathBuf};

use crate::types::AprsError;

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub station: StationConfig,
    pub interface: InterfaceConfig,
    pub aprsis: AprsIsConfig,
    pub webhook: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    pub callsign: String,
    pub passcode: Option<i32>,
    pub gridsquare: Option<String>,
}

/// How the receiver reaches its data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Kiss,
    AprsIs,
}

impl InterfaceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "kiss" => Some(InterfaceKind::Kiss),
            "aprsis" | "aprs-is" => Some(InterfaceKind::AprsIs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceKind::Kiss => "kiss",
            InterfaceKind::AprsIs => "aprsis",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceConfig {
    pub kind: InterfaceKind,
    /// `host:port` for a TCP TNC, otherwise a serial device path.
    pub device: String,
    pub baud: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AprsIsConfig {
    pub server: String,
    pub radius_km: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig {
                callsign: "N0CALL".into(),
                passcode: None,
                gridsquare: None,
            },
            interface: InterfaceConfig {
                kind: InterfaceKind::Kiss,
                device: "127.0.0.1:8001".into(),
                baud: 9600,
            },
            aprsis: AprsIsConfig {
                server: "rotate.aprs.net:14580".into(),
                radius_km: 200,
            },
            webhook: None,
        }
    }
}

/// Get the config directory path (`~/.aprs-decode/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".aprs-decode")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.aprs-decode/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(_) => Config::default(),
    }
}

/// Save config to `~/.aprs-decode/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, AprsError> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save config to an explicit path, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), AprsError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| AprsError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config)).map_err(|e| AprsError::Config(e.to_string()))
}

/// Parse simple YAML-like config text. Unknown keys are ignored.
fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = strip_comment(line).trim();
        if stripped.is_empty() {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            if val.is_empty() {
                current_section = Some(key.to_string());
            } else {
                current_section = None;
                if key == "webhook" {
                    config.webhook = parse_string_value(val);
                }
            }
            continue;
        }

        let Some(section) = current_section.as_deref() else {
            continue;
        };
        match (section, key) {
            ("station", "callsign") => {
                if let Some(v) = parse_string_value(val) {
                    config.station.callsign = v.to_ascii_uppercase();
                }
            }
            ("station", "passcode") => config.station.passcode = parse_number(val),
            ("station", "gridsquare") => config.station.gridsquare = parse_string_value(val),
            ("interface", "type") => {
                if let Some(kind) = parse_string_value(val).and_then(|v| InterfaceKind::parse(&v)) {
                    config.interface.kind = kind;
                }
            }
            ("interface", "device") => {
                if let Some(v) = parse_string_value(val) {
                    config.interface.device = v;
                }
            }
            ("interface", "baud") => {
                if let Some(v) = parse_number(val) {
                    config.interface.baud = v;
                }
            }
            ("aprsis", "server") => {
                if let Some(v) = parse_string_value(val) {
                    config.aprsis.server = v;
                }
            }
            ("aprsis", "radius_km") => {
                if let Some(v) = parse_number(val) {
                    config.aprsis.radius_km = v;
                }
            }
            _ => {}
        }
    }

    config
}

/// Drop a trailing `# comment` that is not inside quotes.
fn strip_comment(line: &str) -> &str {
    let mut in_quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match c {
            '"' | '\'' if in_quote == Some(c) => in_quote = None,
            '"' | '\'' if in_quote.is_none() => in_quote = Some(c),
            '#' if in_quote.is_none() => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_number<T: std::str::FromStr>(val: &str) -> Option<T> {
    parse_string_value(val)?.parse().ok()
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# aprs-decode configuration".to_string(), String::new()];

    lines.push("station:".into());
    lines.push(format!("  callsign: \"{}\"", config.station.callsign));
    match config.station.passcode {
        Some(v) => lines.push(format!("  passcode: {v}")),
        None => lines.push("  passcode: null".into()),
    }
    match &config.station.gridsquare {
        Some(v) => lines.push(format!("  gridsquare: \"{v}\"")),
        None => lines.push("  gridsquare: null".into()),
    }
    lines.push(String::new());

    lines.push("interface:".into());
    lines.push(format!("  type: \"{}\"", config.interface.kind.as_str()));
    lines.push(format!("  device: \"{}\"", config.interface.device));
    lines.push(format!("  baud: {}", config.interface.baud));
    lines.push(String::new());

    lines.push("aprsis:".into());
    lines.push(format!("  server: \"{}\"", config.aprsis.server));
    lines.push(format!("  radius_km: {}", config.aprsis.radius_km));
    lines.push(String::new());

    match &config.webhook {
        Some(url) => lines.push(format!("webhook: \"{url}\"")),
        None => lines.push("webhook: null".into()),
    }

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
