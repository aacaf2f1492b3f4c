// src/engine/mod.rs

//! Supervision engine.
//!
//! - [`supervisor`]: the shared context (shutdown flag, worker registry,
//!   console, notifier) handed to every worker.
//! - [`controller`]: the Starting / Running / Stopping orchestration.
//! - [`lifecycle`]: the pure phase machine the controller steps through.
//! - [`signals`]: termination signals that end the Running phase.

pub mod controller;
pub mod lifecycle;
pub mod signals;
pub mod supervisor;

pub use controller::{Controller, ShutdownReport, StartReport};
pub use lifecycle::{Lifecycle, Phase};
pub use signals::{ShutdownSignal, SignalListener};
pub use supervisor::{Registration, Supervisor, WorkerId, WorkerInfo};

/// Why the Running phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A termination signal was received.
    Signal(ShutdownSignal),
    /// Every worker exited on its own (`exit_with_child`).
    WorkersExited,
    /// Nothing could be started.
    StartupFailed,
}
