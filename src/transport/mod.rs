//! Uplink transports
//!
//! This module handles:
//! - The subscription to The Things Network's MQTT data API
//! - Translating TTN uplink messages into [`tfa_shared::UplinkEvent`]s

pub mod message;
pub mod mqtt;
pub mod traits;

pub use mqtt::TtnMqttSource;
pub use traits::{Received, UplinkSource};
