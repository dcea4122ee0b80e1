//! MQTT subscription to The Things Network's data API

use super::message::parse_uplink;
use super::traits::{Received, UplinkSource};
use crate::config::{ProxyConfig, TtnCredentials};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEFAULT_MQTT_PORT: u16 = 1883;

/// Uplink source subscribed to `{app_id}/devices/+/up`
pub struct TtnMqttSource {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    reconnect_delay: Duration,
}

impl TtnMqttSource {
    /// Create the MQTT client
    ///
    /// The connection itself is established lazily by the first poll.
    pub fn connect(credentials: &TtnCredentials, config: &ProxyConfig) -> Result<Self> {
        let (host, port) = parse_broker_url(&config.mqtt_broker)?;

        let client_id = format!("ttn-proxy-{}", credentials.app_id);
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_credentials(&credentials.app_id, &credentials.app_key);
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, 10);
        let topic = uplink_topic(&credentials.app_id);

        info!(broker = %config.mqtt_broker, topic = %topic, "MQTT client created");

        Ok(Self {
            client,
            eventloop,
            topic,
            reconnect_delay: config.reconnect_delay(),
        })
    }

    fn subscribe(&self) {
        // Clean sessions drop subscriptions, so this runs on every ConnAck
        match self.client.try_subscribe(&self.topic, QoS::AtLeastOnce) {
            Ok(()) => debug!(topic = %self.topic, "subscription requested"),
            Err(e) => error!(topic = %self.topic, error = %e, "failed to request subscription"),
        }
    }
}

#[async_trait]
impl UplinkSource for TtnMqttSource {
    async fn next_uplink(&mut self) -> Result<Received> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(received(&publish.topic, &publish.payload));
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("connected to TTN MQTT broker");
                    self.subscribe();
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    info!(topic = %self.topic, "subscription acknowledged");
                }
                Ok(_) => {
                    // Pings and outgoing packets
                }
                Err(e) => {
                    error!(error = %e, "MQTT connection error");
                    warn!(delay_secs = self.reconnect_delay.as_secs(), "reconnecting to TTN");
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| anyhow!("MQTT disconnect failed: {}", e))
    }

    fn name(&self) -> &'static str {
        "TTN MQTT"
    }
}

fn received(topic: &str, payload: &[u8]) -> Received {
    match parse_uplink(topic, payload) {
        Ok(event) => Received::Uplink(event),
        Err(e) => {
            warn!(topic = %topic, error = %e, "unparsable uplink");
            Received::Unreadable {
                topic: topic.to_string(),
                payload: payload.to_vec(),
                reason: e.to_string(),
            }
        }
    }
}

/// Uplink topic for all devices of an application
pub fn uplink_topic(app_id: &str) -> String {
    format!("{}/devices/+/up", app_id)
}

/// Parse broker URL in format mqtt://host:port, tcp://host:port or host:port
fn parse_broker_url(url: &str) -> Result<(&str, u16)> {
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    let parts: Vec<&str> = url.split(':').collect();
    match parts.as_slice() {
        [host] if !host.is_empty() => Ok((*host, DEFAULT_MQTT_PORT)),
        [host, port] if !host.is_empty() => {
            let port = port
                .parse::<u16>()
                .map_err(|_| anyhow!("Invalid port in broker URL: {}", port))?;
            Ok((*host, port))
        }
        _ => Err(anyhow!("Invalid broker URL format: {}", url)),
    }
}
