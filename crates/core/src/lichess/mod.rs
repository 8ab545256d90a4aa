//! Remote game service over the Lichess Board API

mod client;
mod service;
mod types;

pub use client::{parse_event_line, LichessClient, NdjsonBuffer, LICHESS_API_BASE};
pub use service::{EventReceiver, GameService};
pub use types::*;
