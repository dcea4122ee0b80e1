//! Uplink handler - decodes, routes and submits each uplink

use super::journal::UplinkJournal;
use super::sink::ObservationSink;
use futures::future::join_all;
use std::sync::Arc;
use tfa_shared::{convert, route, DatastreamMap, RouteError, UplinkEvent};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What happened to an uplink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkOutcome {
    /// Message could not be parsed as an uplink
    Unreadable,
    /// Payload too short to decode
    Malformed,
    /// No datastreams configured for the device
    UnknownDevice,
    /// Observations were submitted
    Dispatched {
        delivered: usize,
        failed: usize,
        /// Channels dropped as implausible
        skipped: usize,
    },
}

/// Processes uplinks against a fixed datastream map
pub struct UplinkHandler {
    sink: Arc<dyn ObservationSink>,
    datastreams: Arc<DatastreamMap>,
    journal: UplinkJournal,
}

impl UplinkHandler {
    pub fn new(
        sink: Arc<dyn ObservationSink>,
        datastreams: Arc<DatastreamMap>,
        journal: UplinkJournal,
    ) -> Self {
        Self {
            sink,
            datastreams,
            journal,
        }
    }

    /// Process one uplink to completion
    pub async fn on_uplink(&self, event: &UplinkEvent) -> UplinkOutcome {
        let span = info_span!(
            "uplink",
            device_id = %event.device_id,
            time = %event.timestamp,
            payload_size = event.raw_payload.len(),
        );

        self.process(event).instrument(span).await
    }

    /// Journal a message the source could not parse
    pub async fn on_unreadable(
        &self,
        topic: &str,
        payload: &[u8],
        reason: &str,
    ) -> UplinkOutcome {
        if let Err(e) = self.journal.record_unreadable(topic, payload, reason).await {
            self.journal_failed(&e);
        }
        UplinkOutcome::Unreadable
    }

    fn journal_failed(&self, e: &std::io::Error) {
        warn!(path = %self.journal.path().display(), error = %e, "failed to write uplink journal");
    }

    async fn process(&self, event: &UplinkEvent) -> UplinkOutcome {
        debug!(raw = ?event.raw_payload, "Uplink message");

        let decoded = event.frame().map(|frame| (frame, convert(&frame)));

        let journal_entry = decoded.as_ref().ok().map(|(frame, reading)| (frame, reading));
        if let Err(e) = self.journal.record_uplink(event, journal_entry).await {
            self.journal_failed(&e);
        }

        let (frame, reading) = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(error = %e, "dropping uplink");
                return UplinkOutcome::Malformed;
            }
        };

        info!(
            numeric_id = frame.numeric_device_id,
            humidity = reading.humidity,
            temperature = reading.temperature,
            windspeed = reading.windspeed,
            "decoded"
        );

        let routed = match route(&event.device_id, &reading, &self.datastreams) {
            Ok(routed) => routed,
            Err(RouteError::UnknownDevice(device_id)) => {
                warn!(device_id = %device_id, "invalid device, no datastreams configured");
                return UplinkOutcome::UnknownDevice;
            }
        };

        for invalid in &routed.skipped {
            debug!(sensor = %invalid.kind, value = invalid.value, "invalid reading, skipping");
        }

        // Each POST stands alone; a failure never stops its siblings
        let results = join_all(routed.submissions.iter().map(|submission| async move {
            debug!(
                sensor = %submission.kind,
                url = %submission.url,
                body = %submission.body,
                "POST"
            );
            (submission, self.sink.submit(&submission.url, &submission.body).await)
        }))
        .await;

        let mut delivered = 0;
        let mut failed = 0;
        for (submission, result) in results {
            match result {
                Ok(status) => {
                    delivered += 1;
                    debug!(sensor = %submission.kind, status, "POST status");
                }
                Err(e) => {
                    failed += 1;
                    error!(
                        sensor = %submission.kind,
                        url = %submission.url,
                        error = %e,
                        "observation not delivered"
                    );
                }
            }
        }

        UplinkOutcome::Dispatched {
            delivered,
            failed,
            skipped: routed.skipped.len(),
        }
    }
}
