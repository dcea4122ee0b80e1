//! Fixed-layout codec for TFA weather sensor frames
//!
//! Every uplink carries one 8-byte frame, little-endian:
//! ```text
//!  byte  0          1          2            3          4..8
//!      [ HUMIDITY ][ TEMP lo8 ][ WIND lo4 | TEMP hi4 ][ WIND hi8 ][ DEVICE ID (u32 LE) ]
//! ```
//!
//! Temperature is stored as `(°C * 10) + 500`, windspeed as `km/h * 10`,
//! both 12 bits wide.

use serde::Serialize;
use thiserror::Error;

/// Number of bytes required to decode a frame
pub const FRAME_LEN: usize = 8;

/// Mask for the 12-bit temperature and windspeed fields
pub const TEMPWIND_MASK: u16 = 0x0FFF;

/// Errors that can occur while decoding a frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Malformed payload: need {expected} bytes, have {actual}")]
    MalformedPayload { expected: usize, actual: usize },
}

/// A decoded sensor frame, still in raw sensor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorFrame {
    /// Relative humidity in percent
    pub humidity: u8,
    /// Temperature, offset by 500 and scaled by 10
    pub temperature_raw: u16,
    /// Windspeed in km/h, scaled by 10
    pub windspeed_raw: u16,
    /// Identifier the sensor node generated for itself.
    ///
    /// Routing keys on the network server's device id instead, so this field
    /// is carried along for logging only.
    pub numeric_device_id: u32,
}

/// Decode a frame from the start of `buf`
///
/// Bytes past [`FRAME_LEN`] are ignored.
pub fn decode(buf: &[u8]) -> Result<SensorFrame, PayloadError> {
    if buf.len() < FRAME_LEN {
        return Err(PayloadError::MalformedPayload {
            expected: FRAME_LEN,
            actual: buf.len(),
        });
    }

    let humidity = buf[0];
    let temperature_raw = (u16::from(buf[2] & 0x0F) << 8) | u16::from(buf[1]);
    let windspeed_raw = (u16::from(buf[3]) << 4) | u16::from((buf[2] & 0xF0) >> 4);
    let numeric_device_id = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

    Ok(SensorFrame {
        humidity,
        temperature_raw,
        windspeed_raw,
        numeric_device_id,
    })
}

impl SensorFrame {
    /// Pack the frame the way the sensor node does before transmission
    ///
    /// Temperature and windspeed are masked to their 12-bit width.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let temperature = self.temperature_raw & TEMPWIND_MASK;
        let windspeed = self.windspeed_raw & TEMPWIND_MASK;
        let id = self.numeric_device_id.to_le_bytes();

        [
            self.humidity,
            (temperature & 0xFF) as u8,
            ((temperature >> 8) as u8 & 0x0F) | (((windspeed & 0x0F) as u8) << 4),
            (windspeed >> 4) as u8,
            id[0],
            id[1],
            id[2],
            id[3],
        ]
    }
}

impl TryFrom<&[u8]> for SensorFrame {
    type Error = PayloadError;

    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        decode(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reference_frame() {
        // humidity 100, temperature_raw 0x3E8, windspeed_raw 0
        let frame = decode(&[100, 0xE8, 0x03, 0x00, 0, 0, 0, 0]).expect("decode failed");

        assert_eq!(frame.humidity, 100);
        assert_eq!(frame.temperature_raw, 1000);
        assert_eq!(frame.windspeed_raw, 0);
        assert_eq!(frame.numeric_device_id, 0);
    }

    #[test]
    fn test_shared_byte_nibbles() {
        // byte 2 = 0xA5: low nibble belongs to temperature, high nibble to windspeed
        let frame = decode(&[0, 0x34, 0xA5, 0x7B, 0, 0, 0, 0]).expect("decode failed");

        assert_eq!(frame.temperature_raw, 0x534);
        assert_eq!(frame.windspeed_raw, 0x7BA);
    }

    #[test]
    fn test_device_id_is_little_endian() {
        let frame = decode(&[0, 0, 0, 0, 0x78, 0x56, 0x34, 0x12]).expect("decode failed");
        assert_eq!(frame.numeric_device_id, 0x1234_5678);
    }

    #[test]
    fn test_fields_saturate_at_width() {
        let frame = decode(&[0xFF; FRAME_LEN]).expect("decode failed");

        assert_eq!(frame.humidity, 255);
        assert_eq!(frame.temperature_raw, 0xFFF);
        assert_eq!(frame.windspeed_raw, 0xFFF);
        assert_eq!(frame.numeric_device_id, u32::MAX);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let result = decode(&[100, 0xE8, 0x03]);
        assert_eq!(
            result,
            Err(PayloadError::MalformedPayload {
                expected: FRAME_LEN,
                actual: 3
            })
        );

        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let buf = [100, 0xE8, 0x03, 0x00, 1, 0, 0, 0, 0xDE, 0xAD];
        let frame = decode(&buf).expect("decode failed");

        assert_eq!(frame, decode(&buf[..FRAME_LEN]).expect("decode failed"));
        assert_eq!(frame.numeric_device_id, 1);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let buf = [42, 0x10, 0x27, 0x05, 0xEF, 0xBE, 0xAD, 0xDE];
        assert_eq!(decode(&buf), decode(&buf));
    }

    #[test]
    fn test_encode_masks_and_packs() {
        let frame = SensorFrame {
            humidity: 63,
            temperature_raw: 0x1234, // masked to 0x234
            windspeed_raw: 0x0ABC,
            numeric_device_id: 0xCAFE_F00D,
        };

        let bytes = frame.encode();
        assert_eq!(bytes, [63, 0x34, 0xC2, 0xAB, 0x0D, 0xF0, 0xFE, 0xCA]);

        let decoded = SensorFrame::try_from(&bytes[..]).expect("decode failed");
        assert_eq!(decoded.temperature_raw, 0x234);
        assert_eq!(decoded.windspeed_raw, 0x0ABC);
        assert_eq!(decoded.numeric_device_id, 0xCAFE_F00D);
    }
}
