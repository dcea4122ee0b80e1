mod auth;
mod config;
mod transport;
mod uplink;

#[cfg(test)]
mod test_support;

use crate::auth::{AuthHeader, KeycloakClient};
use crate::config::ProxyConfig;
use crate::transport::{Received, TtnMqttSource, UplinkSource};
use crate::uplink::{HttpObservationSink, UplinkHandler, UplinkJournal, UplinkOutcome};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Forward TFA weather sensor uplinks from TTN to SensorThings datastreams
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with secrets for TTN and KeyCloak
    secrets: PathBuf,

    /// JSON file with OGC datastream URLs
    datastreams: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ProxyConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if let Err(e) = run(cli, config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ProxyConfig) -> Result<()> {
    info!("TTN proxy starting");
    debug!("Configuration: {:?}", config);

    let secrets = crate::config::load_secrets(&cli.secrets)?;

    let ttn = secrets
        .ttn
        .ok_or_else(|| anyhow!("No TTN credentials found in {}", cli.secrets.display()))?;

    let auth = match secrets.keycloak {
        Some(keycloak) => KeycloakClient::new(keycloak, config.http_timeout())?
            .fetch_auth_header()
            .await
            .context("Failed to acquire access token")?,
        None => {
            warn!("No KeyCloak credentials found, observations are sent without authorization");
            AuthHeader::none()
        }
    };
    debug!(auth = ?auth, "auth header ready");

    let datastreams = Arc::new(crate::config::load_datastreams(&cli.datastreams)?);
    info!("Loaded datastreams for {} devices", datastreams.len());
    for device in datastreams.devices() {
        debug!("  device: {}", device);
    }

    let journal = UplinkJournal::open_today(&config.log_dir);
    if let Err(e) = journal.record_datastreams(&datastreams).await {
        warn!(path = %journal.path().display(), error = %e, "failed to write uplink journal");
    }
    info!("  uplink journal: {}", journal.path().display());

    let sink = HttpObservationSink::new(config.http_timeout(), Arc::new(auth))
        .context("Failed to build HTTP client")?;
    let handler = UplinkHandler::new(Arc::new(sink), datastreams, journal);

    let mut source = TtnMqttSource::connect(&ttn, &config)?;
    info!("Waiting for uplinks via {}", source.name());

    // Main event loop: one uplink at a time
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            received = source.next_uplink() => {
                let outcome = match received.context("Uplink source closed")? {
                    Received::Uplink(event) => handler.on_uplink(&event).await,
                    Received::Unreadable { topic, payload, reason } => {
                        handler.on_unreadable(&topic, &payload, &reason).await
                    }
                };
                log_outcome(outcome);
            }
        }
    }

    if let Err(e) = source.shutdown().await {
        warn!("{}", e);
    }
    info!("TTN proxy stopped");
    Ok(())
}

fn log_outcome(outcome: UplinkOutcome) {
    match outcome {
        UplinkOutcome::Dispatched {
            delivered,
            failed,
            skipped,
        } => debug!(delivered, failed, skipped, "uplink processed"),
        other => debug!(outcome = ?other, "uplink processed"),
    }
}
