//! aprs-core: Pure decode library for APRS packet radio traffic.
//!
//! No async, no network: just framing, header parsing, payload decoding
//! and the small amount of math around it. This crate is the shared core
//! used by both `aprs-feeder` (offline capture decoding) and
//! `aprs-receiver` (live TNC / relay daemon).

pub mod ax25;
pub mod config;
pub mod coord;
pub mod decode;
pub mod kiss;
pub mod message;
pub mod noise;
pub mod passcode;
pub mod position;
pub mod types;

// Re-export commonly used types at crate root
pub use coord::gridlocator_to_lonlat;
pub use decode::{decode_frame, decode_payload};
pub use kiss::{Frame, KissDecoder, KissReader};
pub use passcode::login_credential;
pub use types::*;
