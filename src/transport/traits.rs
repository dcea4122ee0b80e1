//! Transport trait abstraction for pluggable uplink sources

use anyhow::Result;
use async_trait::async_trait;
use tfa_shared::UplinkEvent;

/// A message taken off an uplink source
#[derive(Debug, Clone)]
pub enum Received {
    Uplink(UplinkEvent),
    /// Message that could not be read as an uplink
    Unreadable {
        topic: String,
        payload: Vec<u8>,
        reason: String,
    },
}

/// A subscription delivering uplinks one at a time
#[async_trait]
pub trait UplinkSource: Send {
    /// Wait for the next message
    ///
    /// Transient connection problems are handled inside the source; an error
    /// means the source cannot deliver any further uplinks.
    async fn next_uplink(&mut self) -> Result<Received>;

    /// Close the subscription gracefully
    async fn shutdown(&mut self) -> Result<()>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
