//! Time-series persistence of samples and AQI values.
//!
//! The acquisition loop and the updater never talk to the database directly:
//! they push [`PersistEvent`]s into a bounded queue with a non-blocking send,
//! and a single writer task drains the queue into a [`Persistence`] backend.
//! Write failures are logged and dropped, so a missing or slow database never
//! stalls or crashes the monitoring loops.

use std::future::Future;

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::InfluxConfig;
use crate::error::PersistenceError;
use crate::models::Sample;

// ---

/// Measurement name used for every point.
pub const MEASUREMENT: &str = "air_quality_data";

/// Work item for the writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistEvent {
    Pm { sensor_index: usize, sample: Sample },
    Aqi { timestamp: DateTime<Utc>, aqi: f64 },
}

/// Backend accepting the two write calls.
pub trait Persistence: Send + Sync + 'static {
    fn write_pm(
        &self,
        sensor_index: usize,
        sample: &Sample,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn write_aqi(
        &self,
        timestamp: DateTime<Utc>,
        aqi: f64,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Producer side of the persistence queue. Sending never blocks.
#[derive(Debug, Clone)]
pub struct PersistSender {
    tx: mpsc::Sender<PersistEvent>,
}

impl PersistSender {
    /// Queue an event; drops it with a warning when the queue is full.
    pub fn send(&self, event: PersistEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Persistence queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Persistence writer gone, dropping event");
            }
        }
    }
}

/// Create a bounded persistence queue.
pub fn channel(capacity: usize) -> (PersistSender, mpsc::Receiver<PersistEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PersistSender { tx }, rx)
}

/// Counters reported by the writer task when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
}

/// Drain the queue into `store` until every sender is dropped.
pub async fn run_writer<P: Persistence>(
    store: P,
    mut rx: mpsc::Receiver<PersistEvent>,
) -> WriterStats {
    // ---
    let mut stats = WriterStats::default();
    while let Some(event) = rx.recv().await {
        let result = match &event {
            PersistEvent::Pm {
                sensor_index,
                sample,
            } => store.write_pm(*sensor_index, sample).await,
            PersistEvent::Aqi { timestamp, aqi } => store.write_aqi(*timestamp, *aqi).await,
        };
        match result {
            Ok(()) => stats.written += 1,
            Err(e) => {
                stats.failed += 1;
                error!("Failed to persist {}: {}", event_kind(&event), e);
            }
        }
    }
    info!(
        written = stats.written,
        failed = stats.failed,
        "Persistence writer finished"
    );
    stats
}

fn event_kind(event: &PersistEvent) -> &'static str {
    match event {
        PersistEvent::Pm { .. } => "PM sample",
        PersistEvent::Aqi { .. } => "AQI value",
    }
}

/// Line-protocol record for one sensor sample (millisecond precision).
pub fn pm_line(sensor_index: usize, sample: &Sample) -> String {
    format!(
        "{MEASUREMENT},sensor={sensor_index} \
         pm10_cf1={}i,pm25_cf1={}i,pm100_cf1={}i,\
         pm10_std={}i,pm25_std={}i,pm100_std={}i,\
         gr03um={}i,gr05um={}i,gr10um={}i,gr25um={}i,gr50um={}i,gr100um={}i {}",
        sample.pm10_cf1,
        sample.pm25_cf1,
        sample.pm100_cf1,
        sample.pm10_std,
        sample.pm25_std,
        sample.pm100_std,
        sample.gr03um,
        sample.gr05um,
        sample.gr10um,
        sample.gr25um,
        sample.gr50um,
        sample.gr100um,
        sample.timestamp.timestamp_millis()
    )
}

/// Line-protocol record for one AQI value (millisecond precision).
pub fn aqi_line(timestamp: DateTime<Utc>, aqi: f64) -> String {
    format!(
        "{MEASUREMENT} pm25_cf1_aqi={aqi:?} {}",
        timestamp.timestamp_millis()
    )
}

/// InfluxDB v2 HTTP write API backend.
#[derive(Debug, Clone)]
pub struct InfluxWriter {
    client: Client,
    config: InfluxConfig,
}

impl InfluxWriter {
    pub fn new(config: InfluxConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn post(&self, bucket: &str, line: String) -> Result<(), PersistenceError> {
        // ---
        let url = format!("{}/api/v2/write", self.config.url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", bucket),
                ("precision", "ms"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(PersistenceError::Unauthorized(bucket.to_string())),
            StatusCode::NOT_FOUND => Err(PersistenceError::NotFound(bucket.to_string())),
            status => Err(PersistenceError::Status {
                bucket: bucket.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

impl Persistence for InfluxWriter {
    async fn write_pm(&self, sensor_index: usize, sample: &Sample) -> Result<(), PersistenceError> {
        self.post(&self.config.pm_bucket, pm_line(sensor_index, sample))
            .await
    }

    async fn write_aqi(&self, timestamp: DateTime<Utc>, aqi: f64) -> Result<(), PersistenceError> {
        self.post(&self.config.aqi_bucket, aqi_line(timestamp, aqi))
            .await
    }
}
