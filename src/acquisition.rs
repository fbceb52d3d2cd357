//! Sample acquisition loop.
//!
//! Runs on a blocking thread: each cycle reads one sample from every sensor
//! in index order, records the cycle into the session, queues the samples
//! for persistence, and logs a status line. A failed read drops the whole
//! cycle (nothing is recorded or counted) and the next iteration is the
//! retry. The session lock is only taken after all reads have returned.

use tracing::{error, info, warn};

use crate::error::SensorError;
use crate::models::Sample;
use crate::persistence::{PersistEvent, PersistSender};
use crate::sensor::SensorSource;
use crate::session::Session;
use crate::shutdown::StopListener;

// ---

/// Why the loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Stopped,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub end_reason: EndReason,
}

/// Read one sample from every source; the first failure aborts the cycle.
pub fn acquire_cycle<S: SensorSource>(sources: &mut [S]) -> Result<Vec<Sample>, SensorError> {
    sources.iter_mut().map(|source| source.read()).collect()
}

/// Run acquisition until `stop` fires or a source reaches end of stream.
///
/// `stop` is checked between cycles, so a source blocked in `read` finishes
/// that read first.
pub fn run<S: SensorSource>(
    session: &Session,
    sources: &mut [S],
    persist: Option<&PersistSender>,
    stop: &StopListener,
) -> AcquisitionSummary {
    // ---
    let mut cycles = 0;
    let mut failed_cycles = 0;

    info!(sensors = sources.len(), "Start reading data");
    let end_reason = loop {
        if stop.is_stopped() {
            break EndReason::Stopped;
        }

        match acquire_cycle(sources) {
            Ok(samples) => {
                cycles += 1;
                session.record_cycle(&samples);

                if let Some(tx) = persist {
                    for (sensor_index, sample) in samples.into_iter().enumerate() {
                        tx.send(PersistEvent::Pm {
                            sensor_index,
                            sample,
                        });
                    }
                }
                info!("{}", status_line(session));
            }
            Err(e) if e.is_terminal() => {
                warn!("{}, stopping acquisition", e);
                break EndReason::EndOfStream;
            }
            Err(e) => {
                failed_cycles += 1;
                error!("Error: {}", e);
            }
        }
    };

    info!(cycles, failed_cycles, ?end_reason, "Acquisition stopped");
    AcquisitionSummary {
        cycles,
        failed_cycles,
        end_reason,
    }
}

/// One-line console summary of the session.
///
/// `10 min AQI: 50.00 | Good | Elapsed time 12 sec. | Samples 13`, followed by
/// the accuracy figures once more than one sensor is being compared.
pub fn status_line(session: &Session) -> String {
    // ---
    let mut line = format!(
        "{} | {} | Samples {}",
        session.aqi_display(),
        session.elapsed_time(),
        session.sample_count()
    );
    if let Some(report) = session.accuracy() {
        if let Some(err) = report.relative_error_percent {
            line.push_str(&format!(" | Rel. err. {err:.1}%"));
        }
        if let Some(rho) = report.spearman_correlation {
            line.push_str(&format!(" | Spearman corr. {rho:.2}"));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::shutdown::StopSignal;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::VecDeque;

    /// Replays a fixed script of read results, then reports end of stream.
    struct Scripted {
        script: VecDeque<Result<u16, &'static str>>,
        secs: i64,
    }

    impl Scripted {
        fn new(script: Vec<Result<u16, &'static str>>) -> Self {
            Self {
                script: script.into(),
                secs: 0,
            }
        }
    }

    impl SensorSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn read(&mut self) -> Result<Sample, SensorError> {
            self.secs += 60;
            match self.script.pop_front() {
                Some(Ok(pm25)) => {
                    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(self.secs);
                    Ok(Sample {
                        pm25_cf1: pm25,
                        ..Sample::zeroed(ts)
                    })
                }
                Some(Err(msg)) => Err(SensorError::Read("scripted".into(), msg.into())),
                None => Err(SensorError::EndOfStream("scripted".into())),
            }
        }
    }

    #[test]
    fn test_failed_read_drops_the_cycle() {
        let session = Session::new(SessionConfig::default());
        let stop = StopSignal::new();
        let mut sources = vec![Scripted::new(vec![Ok(12), Err("checksum"), Ok(12), Ok(12)])];

        let summary = run(&session, &mut sources, None, &stop.subscribe());

        assert_eq!(
            summary,
            AcquisitionSummary {
                cycles: 3,
                failed_cycles: 1,
                end_reason: EndReason::EndOfStream,
            }
        );
        assert_eq!(session.sample_count(), 3);
        assert_eq!(session.window_len(), 3);
    }

    #[test]
    fn test_one_failing_sensor_aborts_cycle_for_all() {
        let session = Session::new(SessionConfig {
            sensor_count: 2,
            ..SessionConfig::default()
        });
        let mut sources = vec![
            Scripted::new(vec![Ok(10), Ok(10)]),
            Scripted::new(vec![Err("timeout"), Ok(11)]),
        ];

        assert!(acquire_cycle(&mut sources).is_err());
        let samples = acquire_cycle(&mut sources).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(session.window_len(), 0);
    }

    #[test]
    fn test_stopped_before_start() {
        let session = Session::new(SessionConfig::default());
        let stop = StopSignal::new();
        stop.stop();
        let mut sources = vec![Scripted::new(vec![Ok(1)])];

        let summary = run(&session, &mut sources, None, &stop.subscribe());
        assert_eq!(summary.end_reason, EndReason::Stopped);
        assert_eq!(summary.cycles, 0);
    }

    #[test]
    fn test_samples_are_queued_for_persistence() {
        let session = Session::new(SessionConfig {
            sensor_count: 2,
            ..SessionConfig::default()
        });
        let stop = StopSignal::new();
        let (tx, mut rx) = crate::persistence::channel(16);
        let mut sources = vec![
            Scripted::new(vec![Ok(5)]),
            Scripted::new(vec![Ok(6)]),
        ];

        run(&session, &mut sources, Some(&tx), &stop.subscribe());

        let mut indexes = Vec::new();
        while let Ok(PersistEvent::Pm { sensor_index, .. }) = rx.try_recv() {
            indexes.push(sensor_index);
        }
        assert_eq!(indexes, vec![0, 1]);
    }

    #[test]
    fn test_status_line() {
        let session = Session::new(SessionConfig::default());
        assert_eq!(status_line(&session), "N/A | N/A | Samples 0");

        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        session.record_cycle(&[Sample::zeroed(ts)]);
        session.record_cycle(&[Sample::zeroed(ts + Duration::seconds(12))]);
        session.update_aqi();
        assert_eq!(
            status_line(&session),
            "10 min AQI: 0.00 | Good | Elapsed time 12 sec. | Samples 2"
        );
    }
}
