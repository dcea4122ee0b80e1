//! Conversion of raw sensor frames into engineering units

use crate::codec::SensorFrame;
use crate::datastream::SensorKind;
use crate::units::{KPH_PER_MPS, SCALE, TEMPERATURE_OFFSET, WINDSPEED_LIMIT};
use serde::Serialize;
use serde_json::Value;

/// A converted measurement set, ready to be posted as observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Temperature in °C, two decimal places
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: u8,
    /// Windspeed in m/s, two decimal places
    pub windspeed: f64,
}

/// Convert a decoded frame into engineering units
pub fn convert(frame: &SensorFrame) -> Reading {
    let temperature = (f64::from(frame.temperature_raw) - TEMPERATURE_OFFSET) / SCALE;
    let windspeed = (f64::from(frame.windspeed_raw) / KPH_PER_MPS) / SCALE;

    Reading {
        temperature: round2(temperature),
        humidity: frame.humidity,
        windspeed: round2(windspeed),
    }
}

/// Round to two decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl From<&SensorFrame> for Reading {
    fn from(frame: &SensorFrame) -> Self {
        convert(frame)
    }
}

impl Reading {
    /// Whether the windspeed is within the plausible range
    pub fn windspeed_valid(&self) -> bool {
        self.windspeed <= WINDSPEED_LIMIT
    }

    /// The observation result for a sensor kind
    ///
    /// Humidity stays an integer, the other channels are floats.
    pub fn result(&self, kind: SensorKind) -> Value {
        match kind {
            SensorKind::Temperature => Value::from(self.temperature),
            SensorKind::Humidity => Value::from(self.humidity),
            SensorKind::Windspeed => Value::from(self.windspeed),
        }
    }
}
