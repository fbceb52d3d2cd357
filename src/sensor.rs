//! Sensor sources.
//!
//! The monitoring core treats a sensor as an opaque blocking `read()` that
//! yields one complete [`Sample`] or an error. Wire-protocol drivers live
//! outside this crate; what ships here are sources that need no hardware:
//! - [`JsonLinesSource`]: one JSON sample per line from any reader (a replay
//!   file, a FIFO fed by an external driver, stdin).
//! - [`SimulatedSource`]: a deterministic synthetic PM profile.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;

use crate::error::SensorError;
use crate::models::Sample;

// ---

/// A blocking source of samples.
pub trait SensorSource: Send {
    fn name(&self) -> &str;

    /// Block until the next sample is available.
    fn read(&mut self) -> Result<Sample, SensorError>;
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&mut self) -> Result<Sample, SensorError> {
        (**self).read()
    }
}

/// Reads newline-delimited JSON samples.
///
/// Blank lines are skipped; a sample without a `timestamp` is stamped with
/// the time it was read.
pub struct JsonLinesSource<R> {
    name: String,
    reader: R,
    line: String,
}

impl<R: BufRead + Send> JsonLinesSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            line: String::new(),
        }
    }
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open sensor source '{}'", path.display()))?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: BufRead + Send> SensorSource for JsonLinesSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<Sample, SensorError> {
        // ---
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| SensorError::Io(self.name.clone(), e))?;
            if n == 0 {
                return Err(SensorError::EndOfStream(self.name.clone()));
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return serde_json::from_str(trimmed)
                .map_err(|e| SensorError::Malformed(self.name.clone(), e));
        }
    }
}

/// Synthetic sensor producing a slow PM2.5 oscillation with periodic spikes.
///
/// Each `read` sleeps for `interval` to mimic a sensor's sampling cadence.
/// The same `seed` always yields the same value sequence.
pub struct SimulatedSource {
    name: String,
    interval: Duration,
    seed: u64,
    tick: u64,
}

impl SimulatedSource {
    pub fn new(seed: u64, interval: Duration) -> Self {
        Self {
            name: format!("sim:{seed}"),
            interval,
            seed,
            tick: 0,
        }
    }

    /// PM2.5 (CF=1) value for a given tick.
    fn pm25_at(&self, tick: u64) -> f64 {
        let phase = (tick as f64 + self.seed as f64 * 17.0) / 90.0;
        let base = 14.0 + 9.0 * phase.sin();
        // Short plume every ~5 minutes at a 1 s cadence
        let spike = if tick.wrapping_add(self.seed.wrapping_mul(7)) % 300 < 20 { 25.0 } else { 0.0 };
        // Small per-sensor offset so multiple simulated sensors disagree a bit
        (base + spike + (self.seed % 5) as f64 * 0.6).max(0.0)
    }
}

impl SensorSource for SimulatedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<Sample, SensorError> {
        // ---
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
        let pm25 = self.pm25_at(self.tick);
        self.tick += 1;

        let pm25_cf1 = pm25.round() as u16;
        let pm10_cf1 = (pm25 * 0.7).round() as u16;
        let pm100_cf1 = (pm25 * 1.3).round() as u16;
        let gr25um = (pm25 * 4.0).round() as u16;

        Ok(Sample {
            timestamp: Utc::now(),
            pm10_cf1,
            pm25_cf1,
            pm100_cf1,
            // Atmospheric values track CF=1 closely indoors
            pm10_std: pm10_cf1,
            pm25_std: pm25_cf1,
            pm100_std: pm100_cf1,
            gr03um: (pm25 * 180.0).round() as u16,
            gr05um: (pm25 * 55.0).round() as u16,
            gr10um: (pm25 * 12.0).round() as u16,
            gr25um,
            gr50um: gr25um / 4,
            gr100um: gr25um / 12,
        })
    }
}

/// Build sources from `SENSOR_SOURCES` entries.
///
/// `sim` or `sim:<seed>` create a [`SimulatedSource`]; anything else is a
/// path to a JSON-lines file or FIFO. An entry that cannot be opened is logged
/// and skipped; only an empty result is an error. Sensor indexes follow the
/// order of the sources that opened, so index 0 is the first working one.
pub fn open_sources(entries: &[String], sim_interval: Duration) -> Result<Vec<Box<dyn SensorSource>>> {
    // ---
    if entries.is_empty() {
        return Err(anyhow!("No sensor sources configured"));
    }

    let mut sources: Vec<Box<dyn SensorSource>> = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        match open_source(entry, position as u64, sim_interval) {
            Ok(source) => {
                tracing::info!("Sensor {} -> {}", sources.len(), source.name());
                sources.push(source);
            }
            Err(e) => tracing::warn!("Skipping sensor source '{}': {:#}", entry, e),
        }
    }

    if sources.is_empty() {
        return Err(anyhow!(
            "None of the {} configured sensor source(s) could be opened",
            entries.len()
        ));
    }
    Ok(sources)
}

fn open_source(entry: &str, default_seed: u64, sim_interval: Duration) -> Result<Box<dyn SensorSource>> {
    let source: Box<dyn SensorSource> = match entry {
        "sim" => Box::new(SimulatedSource::new(default_seed, sim_interval)),
        s if s.starts_with("sim:") => {
            let seed = s["sim:".len()..]
                .parse::<u64>()
                .map_err(|e| anyhow!("Invalid simulated sensor seed in '{}': {}", s, e))?;
            Box::new(SimulatedSource::new(seed, sim_interval))
        }
        path => Box::new(JsonLinesSource::open(Path::new(path))?),
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LINE: &str = r#"{"timestamp":"2024-05-01T12:00:00Z","pm10_cf1":1,"pm25_cf1":2,"pm100_cf1":3,"pm10_std":4,"pm25_std":5,"pm100_std":6,"gr03um":7,"gr05um":8,"gr10um":9,"gr25um":10,"gr50um":11,"gr100um":12}"#;

    #[test]
    fn test_json_lines_source() {
        let input = format!("{LINE}\n\n{LINE}\nnot json\n");
        let mut source = JsonLinesSource::new("replay", Cursor::new(input));

        assert_eq!(source.read().unwrap().pm25_cf1, 2);
        // The blank line is skipped
        assert_eq!(source.read().unwrap().gr100um, 12);
        assert!(matches!(source.read(), Err(SensorError::Malformed(..))));

        let end = source.read().unwrap_err();
        assert!(end.is_terminal());
        assert_eq!(end.to_string(), "sensor 'replay' reached end of stream");
    }

    #[test]
    fn test_simulated_source_is_deterministic() {
        let mut a = SimulatedSource::new(3, Duration::ZERO);
        let mut b = SimulatedSource::new(3, Duration::ZERO);
        for _ in 0..50 {
            let (sa, sb) = (a.read().unwrap(), b.read().unwrap());
            assert_eq!(sa.pm25_cf1, sb.pm25_cf1);
            assert_eq!(sa.gr03um, sb.gr03um);
        }
        assert_eq!(a.name(), "sim:3");
    }

    #[test]
    fn test_open_sources() {
        let specs = vec!["sim".to_string(), "sim:9".to_string()];
        let sources = open_sources(&specs, Duration::ZERO).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["sim:0", "sim:9"]);

        assert!(open_sources(&[], Duration::ZERO).is_err());
    }

    #[test]
    fn test_open_sources_skips_entries_that_fail() {
        let entries = vec![
            "/nonexistent/sensor.jsonl".to_string(),
            "sim".to_string(),
            "sim:x".to_string(),
        ];
        let sources = open_sources(&entries, Duration::ZERO).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "sim:1");
    }

    #[test]
    fn test_open_sources_fails_when_nothing_opens() {
        let entries = vec!["sim:x".to_string(), "/nonexistent/sensor.jsonl".to_string()];
        let err = open_sources(&entries, Duration::ZERO).err().expect("expected open_sources to fail");
        assert!(err.to_string().contains("None of the 2 configured"));
    }
}
