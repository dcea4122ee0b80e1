//! Append-only uplink journal
//!
//! One file per process start date, `<log_dir>/<YYYYMMDD>_proxy.log`. The
//! datastream map is written once at startup, then every uplink adds one JSON
//! line, whether or not it could be decoded or delivered.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tfa_shared::{DatastreamMap, Reading, SensorFrame, UplinkEvent};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

#[derive(Serialize)]
struct UplinkRecord<'a> {
    device_id: &'a str,
    timestamp: &'a str,
    payload_raw: String,
    frame: Option<&'a SensorFrame>,
    reading: Option<&'a Reading>,
}

#[derive(Serialize)]
struct UnreadableRecord<'a> {
    topic: &'a str,
    message: String,
    error: &'a str,
}

/// Writes uplinks to the daily journal file
#[derive(Debug, Clone)]
pub struct UplinkJournal {
    path: PathBuf,
}

impl UplinkJournal {
    /// Journal in `dir` named after `date`
    pub fn for_date(dir: &Path, date: NaiveDate) -> Self {
        Self {
            path: dir.join(format!("{}_proxy.log", date.format("%Y%m%d"))),
        }
    }

    /// Journal in `dir` named after today's local date
    pub fn open_today(dir: &Path) -> Self {
        Self::for_date(dir, chrono::Local::now().date_naive())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the routing configuration in effect
    pub async fn record_datastreams(&self, map: &DatastreamMap) -> io::Result<()> {
        let line = serde_json::to_string(map)?;
        self.append_line(&line).await
    }

    /// Record an uplink together with whatever could be decoded from it
    pub async fn record_uplink(
        &self,
        event: &UplinkEvent,
        decoded: Option<(&SensorFrame, &Reading)>,
    ) -> io::Result<()> {
        let record = UplinkRecord {
            device_id: &event.device_id,
            timestamp: &event.timestamp,
            payload_raw: STANDARD.encode(&event.raw_payload),
            frame: decoded.map(|(frame, _)| frame),
            reading: decoded.map(|(_, reading)| reading),
        };
        let line = serde_json::to_string(&record)?;
        self.append_line(&line).await
    }

    /// Record a message that could not be parsed as an uplink
    pub async fn record_unreadable(
        &self,
        topic: &str,
        payload: &[u8],
        reason: &str,
    ) -> io::Result<()> {
        let record = UnreadableRecord {
            topic,
            message: String::from_utf8_lossy(payload).into_owned(),
            error: reason,
        };
        let line = serde_json::to_string(&record)?;
        self.append_line(&line).await
    }

    async fn append_line(&self, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}
