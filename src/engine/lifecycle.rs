// src/engine/lifecycle.rs

//! Pure lifecycle state machine; no IO, no locking.

/// Phase of the supervisor process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Starting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Starting -> Running. Returns false from any other phase.
    pub fn mark_running(&mut self) -> bool {
        if self.phase == Phase::Starting {
            self.phase = Phase::Running;
            true
        } else {
            false
        }
    }

    /// Enter Stopping. True only for the first call; later calls (a second
    /// signal during teardown) are ignored.
    pub fn begin_stopping(&mut self) -> bool {
        match self.phase {
            Phase::Starting | Phase::Running => {
                self.phase = Phase::Stopping;
                true
            }
            Phase::Stopping | Phase::Stopped => false,
        }
    }

    pub fn mark_stopped(&mut self) {
        self.phase = Phase::Stopped;
    }
}
