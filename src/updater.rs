//! Periodic AQI updater.
//!
//! Runs for the lifetime of a session: every tick it asks the session for a
//! fresh NowCast AQI, publishes it when available, and forwards it to
//! persistence. A tick without enough data is a no-op; the task still waits
//! for the next tick before trying again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::persistence::{PersistEvent, PersistSender};
use crate::session::Session;
use crate::shutdown::StopListener;

// ---

/// Run the update loop until `stop` fires.
///
/// Returns the number of ticks that published a value.
pub async fn run(
    session: Arc<Session>,
    interval: Duration,
    persist: Option<PersistSender>,
    mut stop: StopListener,
) -> u64 {
    // ---
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut published_ticks = 0;

    info!(?interval, "AQI updater started");
    loop {
        tokio::select! {
            _ = stop.stopped() => break,
            _ = ticker.tick() => {
                if let Some(published) = session.update_aqi() {
                    published_ticks += 1;
                    debug!(aqi = published.result.value, category = %published.result.category, "AQI published");

                    if let Some(tx) = &persist {
                        tx.send(PersistEvent::Aqi {
                            timestamp: published.timestamp,
                            aqi: published.result.value,
                        });
                    }
                }
            }
        }
    }
    info!(published_ticks, "AQI updater stopped");
    published_ticks
}

/// Spawn [`run`] on the current runtime.
pub fn spawn(
    session: Arc<Session>,
    interval: Duration,
    persist: Option<PersistSender>,
    stop: StopListener,
) -> JoinHandle<u64> {
    tokio::spawn(run(session, interval, persist, stop))
}
