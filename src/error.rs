//! Error types shared across the monitoring core.
//!
//! Library-level failures are typed so callers can decide policy (abort a
//! cycle, end acquisition, log and move on). The binary wraps everything in
//! `anyhow` at the edges.

use thiserror::Error;

// ---

/// Failure while reading one sample from a sensor source.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Sensor-specific transient failure; only the current cycle is lost.
    #[error("sensor '{0}' read failed: {1}")]
    Read(String, String),

    /// A line or frame arrived but could not be decoded into a sample.
    #[error("sensor '{0}' produced a malformed sample: {1}")]
    Malformed(String, #[source] serde_json::Error),

    #[error("I/O error on sensor '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    /// The source has no more samples (replay finished, device closed).
    #[error("sensor '{0}' reached end of stream")]
    EndOfStream(String),
}

impl SensorError {
    /// `true` when the source will never produce another sample.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SensorError::EndOfStream(_))
    }
}

/// Failure while writing a point to the time-series database.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("authentication error writing to bucket '{0}'")]
    Unauthorized(String),

    #[error("bucket '{0}' or organization not found")]
    NotFound(String),

    #[error("write to bucket '{bucket}' failed with status {status}: {body}")]
    Status {
        bucket: String,
        status: u16,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
