//! Runtime configuration, secrets and datastream loading

use anyhow::{Context, Result};
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tfa_shared::DatastreamMap;

/// Process settings read from `TTN_PROXY_*` environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProxyConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// TTN MQTT broker, `host[:port]`
    #[serde(default = "default_mqtt_broker")]
    pub mqtt_broker: String,

    #[serde(default = "default_mqtt_keep_alive_secs")]
    pub mqtt_keep_alive_secs: u64,

    /// Delay before polling the broker again after a connection error
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Upper bound for every outbound HTTP request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Directory the daily uplink log is written to
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mqtt_broker() -> String {
    "eu.thethings.network:1883".to_string()
}

fn default_mqtt_keep_alive_secs() -> u64 {
    30
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("TTN_PROXY"))
            .build()?
            .try_deserialize()
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.mqtt_keep_alive_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// TTN application credentials
#[derive(Deserialize, Clone)]
pub struct TtnCredentials {
    pub app_id: String,
    /// Application access key
    pub app_key: String,
}

impl fmt::Debug for TtnCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtnCredentials")
            .field("app_id", &self.app_id)
            .field("app_key", &"***")
            .finish()
    }
}

/// Keycloak client and user credentials
#[derive(Deserialize, Clone)]
pub struct KeycloakCredentials {
    /// Token endpoint of the realm
    pub url: String,
    pub id_client: String,
    pub id_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for KeycloakCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeycloakCredentials")
            .field("url", &self.url)
            .field("id_client", &self.id_client)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Contents of the secrets file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Secrets {
    pub ttn: Option<TtnCredentials>,
    pub keycloak: Option<KeycloakCredentials>,
}

impl Secrets {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid secrets file")
    }
}

pub fn load_secrets(path: &Path) -> Result<Secrets> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read secrets file {}", path.display()))?;
    Secrets::from_json(&json)
}

pub fn load_datastreams(path: &Path) -> Result<DatastreamMap> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read datastream file {}", path.display()))?;
    DatastreamMap::from_json(&json)
        .with_context(|| format!("Failed to parse datastream file {}", path.display()))
}
