//! TTN uplink message format
//!
//! Uplinks are published on `{app_id}/devices/{dev_id}/up` as JSON:
//! ```json
//! { "app_id": "weather", "dev_id": "tfa-01", "port": 1, "counter": 42,
//!   "payload_raw": "ZOgDAAAAAAA=", "metadata": { "time": "2019-05-01T10:00:00.123Z" } }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tfa_shared::UplinkEvent;
use thiserror::Error;

/// Errors that can occur while parsing an uplink message
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Invalid topic '{0}': expected '{{app_id}}/devices/{{dev_id}}/up'")]
    InvalidTopic(String),

    #[error("Invalid uplink JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Application and device named by an uplink topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub app_id: String,
    pub device_id: String,
}

/// Parse a topic of the form `{app_id}/devices/{dev_id}/up`
pub fn parse_topic(topic: &str) -> Result<ParsedTopic, MessageError> {
    let parts: Vec<&str> = topic.split('/').collect();

    match parts.as_slice() {
        [app_id, "devices", device_id, "up"] if !app_id.is_empty() && !device_id.is_empty() => {
            Ok(ParsedTopic {
                app_id: app_id.to_string(),
                device_id: device_id.to_string(),
            })
        }
        _ => Err(MessageError::InvalidTopic(topic.to_string())),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UplinkMetadata {
    #[serde(default)]
    pub time: Option<String>,
}

/// The parts of a TTN uplink message the proxy uses
#[derive(Debug, Clone, Deserialize)]
pub struct TtnUplink {
    #[serde(default)]
    pub dev_id: Option<String>,
    /// Base64 frame; absent for empty uplinks
    #[serde(default)]
    pub payload_raw: Option<String>,
    #[serde(default)]
    pub metadata: UplinkMetadata,
}

impl TtnUplink {
    pub fn from_slice(json: &[u8]) -> Result<Self, MessageError> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Convert into an [`UplinkEvent`]
    ///
    /// `topic_device` is used when the message does not name its device.
    pub fn into_event(self, topic_device: &str) -> Result<UplinkEvent, MessageError> {
        let payload = match self.payload_raw {
            Some(encoded) => STANDARD.decode(encoded.trim())?,
            None => Vec::new(),
        };

        Ok(UplinkEvent::new(
            self.dev_id.unwrap_or_else(|| topic_device.to_string()),
            self.metadata.time.unwrap_or_default(),
            payload,
        ))
    }
}

/// Parse an MQTT publish into an uplink event
pub fn parse_uplink(topic: &str, payload: &[u8]) -> Result<UplinkEvent, MessageError> {
    let parsed = parse_topic(topic)?;
    tracing::trace!(app_id = %parsed.app_id, device_id = %parsed.device_id, "uplink topic");
    TtnUplink::from_slice(payload)?.into_event(&parsed.device_id)
}
