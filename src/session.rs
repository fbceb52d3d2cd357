//! Monitoring session: the single owner of all shared monitoring state.
//!
//! One [`Session`] is built per monitoring run and shared (`Arc<Session>`)
//! between the acquisition loop, the AQI updater, and the status routes.
//! Every access goes through one mutex, and every critical section is short:
//! append-and-evict on the acquisition side, snapshot or publish on the
//! updater side. Nothing here blocks on I/O or sleeps while holding the lock.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::accuracy::{self, AccuracyReport};
use crate::breakpoints::{self, AqiResult};
use crate::models::{Reading, Sample, PARTICLE_SIZES};
use crate::nowcast;
use crate::window::{RingBuffer, SlidingWindow, MEASUREMENT_WINDOW_LENGTH_SEC};

// ---

/// Sizing for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sensor_count: usize,
    pub display_buffer_len: usize,
    pub aqi_history_len: usize,
    pub accuracy_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sensor_count: 1,
            display_buffer_len: 100,
            aqi_history_len: 10_000,
            accuracy_window: 20,
        }
    }
}

/// Latest AQI published by the updater.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PublishedAqi {
    #[serde(flatten)]
    pub result: AqiResult,
    /// Timestamp of the newest window reading the value was computed from.
    pub timestamp: DateTime<Utc>,
    pub window_minutes: i64,
}

impl fmt::Display for PublishedAqi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} min AQI: {:.2} | {}",
            self.window_minutes, self.result.value, self.result.category
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AqiPoint {
    pub timestamp: DateTime<Utc>,
    pub aqi: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticleSeries {
    pub size: &'static str,
    pub counts: RingBuffer<u16>,
}

/// Count-bounded presentation buffers for one sensor.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSeries {
    pub timestamps: RingBuffer<DateTime<Utc>>,
    pub pm1_cf1: RingBuffer<u16>,
    pub pm2_5_cf1: RingBuffer<u16>,
    pub pm10_cf1: RingBuffer<u16>,
    pub pm1_std: RingBuffer<u16>,
    pub pm2_5_std: RingBuffer<u16>,
    pub pm10_std: RingBuffer<u16>,
    pub particle_counts: Vec<ParticleSeries>,
}

impl SensorSeries {
    fn new(capacity: usize) -> Self {
        Self {
            timestamps: RingBuffer::new(capacity),
            pm1_cf1: RingBuffer::new(capacity),
            pm2_5_cf1: RingBuffer::new(capacity),
            pm10_cf1: RingBuffer::new(capacity),
            pm1_std: RingBuffer::new(capacity),
            pm2_5_std: RingBuffer::new(capacity),
            pm10_std: RingBuffer::new(capacity),
            particle_counts: PARTICLE_SIZES
                .iter()
                .map(|&size| ParticleSeries {
                    size,
                    counts: RingBuffer::new(capacity),
                })
                .collect(),
        }
    }

    fn push(&mut self, sample: &Sample) {
        self.timestamps.push(sample.timestamp);
        self.pm1_cf1.push(sample.pm10_cf1);
        self.pm2_5_cf1.push(sample.pm25_cf1);
        self.pm10_cf1.push(sample.pm100_cf1);
        self.pm1_std.push(sample.pm10_std);
        self.pm2_5_std.push(sample.pm25_std);
        self.pm10_std.push(sample.pm100_std);
        for (series, count) in self.particle_counts.iter_mut().zip(sample.particle_counts()) {
            series.counts.push(count);
        }
    }
}

/// Everything a display collaborator may pull, copied out under the lock.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub sample_count: u64,
    pub elapsed_time: String,
    pub aqi: Option<PublishedAqi>,
    pub aqi_display: String,
    pub accuracy: Option<AccuracyReport>,
    pub window_len: usize,
    pub sensors: Vec<SensorSeries>,
    pub aqi_history: RingBuffer<AqiPoint>,
}

#[derive(Debug)]
struct SessionState {
    window: SlidingWindow,
    sensors: Vec<SensorSeries>,
    accuracy_buffers: Vec<RingBuffer<f64>>,
    accuracy: Option<AccuracyReport>,
    aqi_history: RingBuffer<AqiPoint>,
    published: Option<PublishedAqi>,
    sample_count: u64,
    start_time: Option<DateTime<Utc>>,
    elapsed_time: String,
}

/// Shared state for one monitoring run.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    sensor_count: usize,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        // ---
        let sensor_count = config.sensor_count.max(1);
        let state = SessionState {
            window: SlidingWindow::new(),
            sensors: (0..sensor_count)
                .map(|_| SensorSeries::new(config.display_buffer_len))
                .collect(),
            accuracy_buffers: (0..sensor_count)
                .map(|_| RingBuffer::new(config.accuracy_window))
                .collect(),
            accuracy: None,
            aqi_history: RingBuffer::new(config.aqi_history_len),
            published: None,
            sample_count: 0,
            start_time: None,
            elapsed_time: "N/A".to_string(),
        };

        Self {
            id: Uuid::new_v4(),
            sensor_count,
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_count
    }

    // A panic elsewhere never leaves a half-applied update behind, so a
    // poisoned lock is still safe to use.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one PM2.5 reading to the sliding window.
    pub fn record(&self, timestamp: DateTime<Utc>, value: f64) {
        self.state().window.record(timestamp, value);
    }

    /// Apply one successful acquisition cycle: one sample per sensor, in
    /// sensor index order.
    ///
    /// Updates the presentation buffers, feeds every sample's PM2.5 into the
    /// window, bumps the sample counter and elapsed time, and refreshes the
    /// accuracy report once all comparison buffers are full. Returns the new
    /// sample count.
    pub fn record_cycle(&self, samples: &[Sample]) -> u64 {
        // ---
        let mut state = self.state();
        let state = &mut *state;

        for (index, sample) in samples.iter().enumerate().take(self.sensor_count) {
            state.sensors[index].push(sample);
            let reading = sample.to_reading();
            state.accuracy_buffers[index].push(reading.concentration);
            state.window.record(reading.timestamp, reading.concentration);
        }

        if let Some(first) = samples.first() {
            let start = *state.start_time.get_or_insert(first.timestamp);
            let elapsed = (first.timestamp - start).num_seconds();
            state.elapsed_time = format_elapsed(elapsed);
        }
        state.sample_count += 1;

        if let Some(report) = accuracy::compare(&state.accuracy_buffers) {
            state.accuracy = Some(report);
        }

        state.sample_count
    }

    pub fn window_snapshot(&self) -> Vec<Reading> {
        self.state().window.snapshot()
    }

    pub fn window_len(&self) -> usize {
        self.state().window.len()
    }

    pub fn window_is_aligned(&self) -> bool {
        self.state().window.is_aligned()
    }

    /// Run one NowCast computation and, if it yields an AQI, publish it.
    ///
    /// The window is copied under the lock and the estimate is computed
    /// outside it. Returns `None` (and leaves the previous publication in
    /// place) when there is too little data or the concentration is out of
    /// range.
    pub fn update_aqi(&self) -> Option<PublishedAqi> {
        // ---
        let snapshot = self.window_snapshot();
        let Some(concentration) = nowcast::estimate(&snapshot) else {
            tracing::trace!(readings = snapshot.len(), "NowCast unavailable");
            return None;
        };
        let Some(result) = breakpoints::to_aqi(concentration) else {
            tracing::debug!(concentration, "NowCast concentration outside breakpoint table");
            return None;
        };
        let timestamp = snapshot.last()?.timestamp;

        let published = PublishedAqi {
            result,
            timestamp,
            window_minutes: MEASUREMENT_WINDOW_LENGTH_SEC / 60,
        };

        let mut state = self.state();
        state.published = Some(published);
        state.aqi_history.push(AqiPoint {
            timestamp,
            aqi: result.value,
        });
        Some(published)
    }

    pub fn published(&self) -> Option<PublishedAqi> {
        self.state().published
    }

    /// The published AQI as a display line, `"N/A"` before the first one.
    pub fn aqi_display(&self) -> String {
        self.published()
            .map_or_else(|| "N/A".to_string(), |p| p.to_string())
    }

    pub fn accuracy(&self) -> Option<AccuracyReport> {
        self.state().accuracy
    }

    pub fn sample_count(&self) -> u64 {
        self.state().sample_count
    }

    pub fn elapsed_time(&self) -> String {
        self.state().elapsed_time.clone()
    }

    pub fn status(&self) -> SessionStatus {
        // ---
        let state = self.state();
        SessionStatus {
            session_id: self.id,
            sample_count: state.sample_count,
            elapsed_time: state.elapsed_time.clone(),
            aqi: state.published,
            aqi_display: state
                .published
                .map_or_else(|| "N/A".to_string(), |p| p.to_string()),
            accuracy: state.accuracy,
            window_len: state.window.len(),
            sensors: state.sensors.clone(),
            aqi_history: state.aqi_history.clone(),
        }
    }
}

/// Human-readable run time, e.g. `"Elapsed time 2 min., 05 sec."`.
pub fn format_elapsed(total_seconds: i64) -> String {
    // ---
    let total_seconds = total_seconds.max(0);
    let days = total_seconds / 86_400;
    let hours = total_seconds % 86_400 / 3_600;
    let minutes = total_seconds % 3_600 / 60;
    let seconds = total_seconds % 60;

    let body = if days > 0 {
        format!("{days} days, {hours:02} hours, {minutes:02} min., {seconds:02} sec.")
    } else if hours > 0 {
        format!("{hours} hours, {minutes:02} min., {seconds:02} sec.")
    } else if minutes > 0 {
        format!("{minutes} min., {seconds:02} sec.")
    } else {
        format!("{seconds} sec.")
    };
    format!("Elapsed time {body}")
}
