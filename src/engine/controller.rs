// src/engine/controller.rs

use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, error, info, warn};

use crate::cleanup::clean_temp_files;
use crate::config::Config;
use crate::engine::lifecycle::{Lifecycle, Phase};
use crate::engine::signals::SignalListener;
use crate::engine::supervisor::{Supervisor, WorkerInfo};
use crate::engine::StopReason;
use crate::errors::{Result, ShrinkwrapError};
use crate::exec::{Worker, WorkerExit};
use crate::fs::FileSystem;
use crate::notify::NotifyState;
use crate::resolve::{ResolvedBinary, resolve_binary};
use crate::template::{self, Command};

/// What `start` brought up.
#[derive(Debug)]
pub struct StartReport {
    pub binary: ResolvedBinary,
    pub started: Vec<WorkerInfo>,
    pub spawn_failures: usize,
}

/// Outcome of the Stopping sequence.
#[derive(Debug)]
pub struct ShutdownReport {
    pub reason: StopReason,
    /// One entry per joined worker.
    pub exits: Vec<WorkerExit>,
    /// Workers whose thread panicked instead of returning.
    pub panicked: usize,
    pub spawn_failures: usize,
    /// Whether `STOPPING=1` was delivered.
    pub notified: bool,
}

impl ShutdownReport {
    /// True when startup fully succeeded and teardown completed.
    pub fn is_success(&self) -> bool {
        self.reason != StopReason::StartupFailed && self.spawn_failures == 0 && self.panicked == 0
    }
}

/// Top-level orchestrator: starts workers, waits for a stop reason, tears
/// everything down exactly once.
///
/// The join handles are owned here and never shared; membership of the
/// shared registry is managed by the workers themselves.
pub struct Controller {
    supervisor: Arc<Supervisor>,
    config: Config,
    lifecycle: Lifecycle,
    handles: Vec<JoinHandle<WorkerExit>>,
    spawn_failures: usize,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("lifecycle", &self.lifecycle)
            .field("workers", &self.handles.len())
            .field("spawn_failures", &self.spawn_failures)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(supervisor: Arc<Supervisor>, config: Config) -> Self {
        Self {
            supervisor,
            config,
            lifecycle: Lifecycle::new(),
            handles: Vec::new(),
            spawn_failures: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// Starting phase: clean temp files, resolve the binary, expand every
    /// command and start one worker per command.
    ///
    /// Fails if the binary cannot be resolved or no worker could be started.
    /// Individual spawn failures are logged and counted while the remaining
    /// workers keep running.
    pub fn start(&mut self, fs: &dyn FileSystem) -> Result<StartReport> {
        info!(service = %self.config.service_name(), "shrinkwrap is starting");

        if let Some(tempdir) = self.config.tempdir() {
            clean_temp_files(fs, tempdir, self.config.binary());
        }
        debug!(config = ?self.config, "found configuration");

        let binary = resolve_binary(fs, self.config.binary(), self.config.basedir())?;
        info!(binary = %binary, "resolved binary");
        info!(extra_vars = ?self.config.extra_vars(), "resolved extra vars");

        let commands: Vec<Command> = self
            .config
            .commands()
            .iter()
            .map(|tpl| {
                template::expand(
                    &binary,
                    tpl,
                    self.config.extra_vars(),
                    self.config.environment(),
                )
            })
            .collect();

        let mut started = Vec::with_capacity(commands.len());
        let mut last_error = None;
        for command in &commands {
            info!(command = %command, env = ?command.env, "resolved command");
            match self.start_worker(&binary, command) {
                Ok(info) => started.push(info),
                Err(err) => {
                    error!(command = %command, error = %err, "failed to start worker");
                    self.spawn_failures += 1;
                    last_error = Some(err);
                }
            }
        }

        if started.is_empty() {
            return Err(match last_error {
                Some(err) if self.spawn_failures == 1 => err,
                _ => ShrinkwrapError::NoWorkersStarted {
                    failures: self.spawn_failures,
                },
            });
        }

        self.lifecycle.mark_running();
        let names: Vec<_> = started.iter().map(|w| w.name.as_str()).collect();
        info!(workers = ?names, "spawned workers");

        Ok(StartReport {
            binary,
            started,
            spawn_failures: self.spawn_failures,
        })
    }

    fn start_worker(&mut self, binary: &ResolvedBinary, command: &Command) -> Result<WorkerInfo> {
        let worker = Worker::spawn(
            &self.supervisor,
            binary.name(),
            command,
            self.config.ready_marker(),
        )?;
        let info = worker.info().clone();
        let handle = worker.start()?;
        self.handles.push(handle);
        Ok(info)
    }

    /// Running phase: block until a handled signal arrives (or, with
    /// `exit_with_child`, until every worker has exited on its own).
    pub async fn wait_for_stop(&self, signals: &mut SignalListener) -> StopReason {
        if self.config.exit_with_child() {
            tokio::select! {
                signal = signals.recv() => StopReason::Signal(signal),
                _ = self.all_workers_exited() => StopReason::WorkersExited,
            }
        } else {
            StopReason::Signal(signals.recv().await)
        }
    }

    // A permit stored while workers were still being started can be stale.
    async fn all_workers_exited(&self) {
        loop {
            if self.supervisor.worker_count() == 0 {
                return;
            }
            self.supervisor.drained().await;
        }
    }

    /// Stopping phase: set the shutdown flag, join every worker, then send
    /// `STOPPING=1`.
    ///
    /// Blocking. Only the first call does anything; later calls return an
    /// empty report.
    pub fn shutdown(&mut self, reason: StopReason) -> ShutdownReport {
        if !self.lifecycle.begin_stopping() {
            debug!(?reason, "already stopping; ignoring");
            return ShutdownReport {
                reason,
                exits: Vec::new(),
                panicked: 0,
                spawn_failures: self.spawn_failures,
                notified: false,
            };
        }

        match reason {
            StopReason::Signal(signal) => info!(signal = %signal, "caught signal {signal}"),
            StopReason::WorkersExited => info!("all workers exited"),
            StopReason::StartupFailed => info!("startup failed; stopping"),
        }

        let had_workers = !self.handles.is_empty();
        self.supervisor.request_shutdown();

        let mut exits = Vec::with_capacity(self.handles.len());
        let mut panicked = 0;
        for handle in self.handles.drain(..) {
            match handle.join() {
                Ok(exit) => exits.push(exit),
                Err(_) => {
                    error!("worker thread panicked");
                    panicked += 1;
                }
            }
        }

        info!(joined = exits.len(), "killed all workers; exiting gracefully");
        let remaining = self.supervisor.live_workers();
        if remaining.is_empty() {
            debug!("no workers still registered");
        } else {
            warn!(?remaining, "workers still registered after join");
        }

        let notified = had_workers && self.supervisor.notify(NotifyState::Stopping);
        self.lifecycle.mark_stopped();

        ShutdownReport {
            reason,
            exits,
            panicked,
            spawn_failures: self.spawn_failures,
            notified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ShutdownSignal;

    fn report(reason: StopReason, spawn_failures: usize, panicked: usize) -> ShutdownReport {
        ShutdownReport {
            reason,
            exits: Vec::new(),
            panicked,
            spawn_failures,
            notified: false,
        }
    }

    #[test]
    fn success_requires_clean_start_and_teardown() {
        let signal = StopReason::Signal(ShutdownSignal::Terminate);
        assert!(report(signal, 0, 0).is_success());
        assert!(report(StopReason::WorkersExited, 0, 0).is_success());
        assert!(!report(StopReason::StartupFailed, 0, 0).is_success());
        assert!(!report(signal, 1, 0).is_success());
        assert!(!report(signal, 0, 1).is_success());
    }
}
