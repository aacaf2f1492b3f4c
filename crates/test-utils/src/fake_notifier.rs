use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use shrinkwrap::errors::{Result, ShrinkwrapError};
use shrinkwrap::notify::{Notifier, NotifyState};

/// A fake notifier that:
/// - records every state it was asked to send, in order
/// - optionally fails every call (to check failures are not fatal).
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<NotifyState>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every call returns an error.
    pub fn failing() -> Self {
        let n = Self::default();
        n.failing.store(true, Ordering::SeqCst);
        n
    }

    /// States recorded so far (failed attempts included).
    pub fn sent(&self) -> Vec<NotifyState> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, state: NotifyState) -> usize {
        self.sent().into_iter().filter(|s| *s == state).count()
    }

    /// Poll until `state` has been recorded or `timeout` passes.
    pub fn wait_for(&self, state: NotifyState, timeout: Duration) -> bool {
        self.wait_for_count(state, 1, timeout)
    }

    /// Poll until `state` has been recorded at least `n` times.
    pub fn wait_for_count(&self, state: NotifyState, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(state) >= n {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, state: NotifyState) -> Result<()> {
        self.sent.lock().unwrap().push(state);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShrinkwrapError::Other(anyhow::anyhow!(
                "notification socket unavailable"
            )));
        }
        Ok(())
    }
}
