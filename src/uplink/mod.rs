//! Uplink processing pipeline
//!
//! This module handles:
//! - Decoding, converting and routing each uplink
//! - Posting observations to the configured endpoints
//! - The append-only uplink journal

mod handler;
mod journal;
mod sink;

pub use handler::{UplinkHandler, UplinkOutcome};
pub use journal::UplinkJournal;
pub use sink::HttpObservationSink;
