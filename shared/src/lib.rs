//! TFA Weather Sensor Shared Types
//!
//! This crate provides the I/O-free core of the TTN proxy: the payload codec
//! for the sensor node's 8-byte frame, conversion to engineering units and
//! routing of readings to per-device observation endpoints.

pub mod codec;
pub mod datastream;
pub mod reading;

use bytes::Bytes;

pub use codec::{decode, PayloadError, SensorFrame, FRAME_LEN};
pub use datastream::{
    route, DatastreamError, DatastreamMap, InvalidReading, Route, RouteError, SensorKind,
    SensorRoutes, Submission,
};
pub use reading::{convert, Reading};

/// Unit conversion parameters
pub mod units {
    /// Fixed divisor applied to raw temperature and windspeed values
    pub const SCALE: f64 = 10.0;

    /// Offset the sensor node adds to the scaled temperature
    pub const TEMPERATURE_OFFSET: f64 = 500.0;

    /// km/h per m/s
    pub const KPH_PER_MPS: f64 = 3.6;

    /// Windspeeds above this value (m/s) are not forwarded
    pub const WINDSPEED_LIMIT: f64 = 200.0;
}

/// An uplink as delivered by the network server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplinkEvent {
    /// Device id assigned by the network server
    pub device_id: String,
    /// Receive time as reported by the network server
    pub timestamp: String,
    pub raw_payload: Bytes,
}

impl UplinkEvent {
    /// Create a new uplink event
    pub fn new(
        device_id: impl Into<String>,
        timestamp: impl Into<String>,
        raw_payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp: timestamp.into(),
            raw_payload: raw_payload.into(),
        }
    }

    /// Decode the payload carried by this uplink
    pub fn frame(&self) -> Result<SensorFrame, PayloadError> {
        decode(&self.raw_payload)
    }
}
