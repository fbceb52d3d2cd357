//! Bounded buffers for readings.
//!
//! Two bounding policies live here as separate types:
//! - [`SlidingWindow`] is bounded by time (the NowCast input, 10 minutes).
//! - [`RingBuffer`] is bounded by count (presentation and comparison buffers).

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};

use crate::models::Reading;

// ---

/// Length of the NowCast measurement window in seconds.
pub const MEASUREMENT_WINDOW_LENGTH_SEC: i64 = 600;

/// Time-bounded window of PM2.5 readings.
///
/// Timestamps and values are kept in two index-aligned sequences that are
/// always mutated together.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindow {
    timestamps: VecDeque<DateTime<Utc>>,
    values: VecDeque<f64>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading, then drop from the front every reading older than the
    /// window length relative to `timestamp`.
    ///
    /// `timestamp` is taken as "now" even if it is earlier than readings
    /// already present, so an out-of-order insert evicts relative to itself.
    pub fn record(&mut self, timestamp: DateTime<Utc>, value: f64) {
        // ---
        self.timestamps.push_back(timestamp);
        self.values.push_back(value);

        let horizon = Duration::seconds(MEASUREMENT_WINDOW_LENGTH_SEC);
        while let Some(&oldest) = self.timestamps.front() {
            if timestamp - oldest <= horizon {
                break;
            }
            self.timestamps.pop_front();
            self.values.pop_front();
        }
    }

    /// Copy of the current readings, oldest first.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .map(|(&timestamp, &value)| Reading::new(timestamp, value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// `true` when both sequences have the same length.
    pub fn is_aligned(&self) -> bool {
        self.timestamps.len() == self.values.len()
    }
}

/// Fixed-capacity FIFO; pushing onto a full buffer drops the oldest item.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T: Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_record_evicts_old_readings() {
        let mut window = SlidingWindow::new();
        window.record(at(0), 1.0);
        window.record(at(300), 2.0);
        window.record(at(600), 3.0);
        // Exactly 600s old is still inside the window
        assert_eq!(window.len(), 3);

        window.record(at(601), 4.0);
        let values: Vec<f64> = window.snapshot().iter().map(|r| r.concentration).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert!(window.is_aligned());
    }

    #[test]
    fn test_eviction_invariant_holds_after_every_record() {
        let mut window = SlidingWindow::new();
        let mut t = 0;
        for i in 0..500 {
            // Irregular cadence between 1s and 37s
            t += 1 + (i * 7) % 37;
            window.record(at(t), i as f64);

            let latest = at(t);
            assert!(window.is_aligned());
            for reading in window.snapshot() {
                assert!(latest - reading.timestamp <= Duration::seconds(600));
            }
        }
    }

    #[test]
    fn test_out_of_order_insert_evicts_relative_to_itself() {
        let mut window = SlidingWindow::new();
        window.record(at(0), 1.0);
        window.record(at(1000), 2.0);
        // The 1000s reading evicted the first one
        assert_eq!(window.len(), 1);

        // An earlier timestamp from a lagging sensor does not evict the
        // newer reading at the front
        window.record(at(100), 3.0);
        assert_eq!(window.len(), 2);
        assert_eq!(window.snapshot().last().unwrap().concentration, 3.0);

        // A reading far in the future evicts everything older than itself
        window.record(at(5000), 4.0);
        assert_eq!(window.len(), 1);
        assert_eq!(window.snapshot()[0].timestamp, at(5000));
    }

    #[test]
    fn test_empty_window() {
        let window = SlidingWindow::new();
        assert!(window.is_empty());
        assert!(window.snapshot().is_empty());
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut ring = RingBuffer::new(3);
        assert!(!ring.is_full());
        for i in 0..5 {
            ring.push(i);
        }
        assert!(ring.is_full());
        assert_eq!(ring.to_vec(), vec![2, 3, 4]);
        assert_eq!(serde_json::to_string(&ring).unwrap(), "[2,3,4]");
    }

    #[test]
    fn test_ring_buffer_zero_capacity_stays_empty() {
        let mut ring = RingBuffer::new(0);
        ring.push(1);
        assert!(ring.is_empty());
        assert!(ring.is_full());
    }
}
