//! Explicit stop signal for the session's long-running tasks.
//!
//! Backed by a `watch` channel so any number of tasks can hold a receiver,
//! and both async tasks (`changed().await`) and the blocking acquisition
//! thread (`is_stopped()`) can observe it.

use tokio::sync::watch;

// ---

#[derive(Debug)]
pub struct StopSignal {
    tx: watch::Sender<bool>,
}

/// Receiving half handed to each task.
#[derive(Debug, Clone)]
pub struct StopListener {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Ask every listener to stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopListener {
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop has been requested or the signal was dropped.
    pub async fn stopped(&mut self) {
        // ---
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_reaches_all_listeners() {
        let signal = StopSignal::new();
        let mut a = signal.subscribe();
        let b = signal.subscribe();
        assert!(!a.is_stopped());

        signal.stop();
        a.stopped().await;
        assert!(b.is_stopped());

        // Listeners created after the stop see it immediately
        let mut late = signal.subscribe();
        late.stopped().await;
    }

    #[tokio::test]
    async fn test_dropped_signal_releases_listeners() {
        let signal = StopSignal::new();
        let mut listener = signal.subscribe();
        drop(signal);
        listener.stopped().await;
        assert!(!listener.is_stopped());
    }
}
