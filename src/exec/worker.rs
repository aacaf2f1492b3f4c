// src/exec/worker.rs

//! One supervised child process.
//!
//! A [`Worker`] exclusively owns its `Child` and both output pipes. Its run
//! loop forwards every line to the console, fires `READY=1` the first time
//! the ready marker is seen, kills the child once the supervisor's shutdown
//! flag is up, and deregisters itself when the child is gone.

use std::io;
use std::process::{Child, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::supervisor::{Registration, Supervisor, WorkerInfo};
use crate::errors::{Result, ShrinkwrapError};
use crate::exec::stream::{StreamKind, WorkerEvent, spawn_line_reader};
use crate::notify::NotifyState;
use crate::template::Command;

/// How often a worker whose pipes are closed re-checks a child that has not
/// exited yet.
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Summary returned by a worker thread.
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub info: WorkerInfo,
    pub status: Option<ExitStatus>,
    /// Whether `READY=1` was sent for this worker.
    pub ready: bool,
    /// Whether the worker killed its child because of shutdown.
    pub killed: bool,
    pub lines: usize,
}

pub struct Worker {
    child: Child,
    events: Receiver<WorkerEvent>,
    readers: Vec<JoinHandle<()>>,
    registration: Registration,
    supervisor: Arc<Supervisor>,
    ready_marker: String,
    ready_sent: bool,
    killed: bool,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("info", self.info())
            .field("ready_sent", &self.ready_sent)
            .field("killed", &self.killed)
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Spawn the child for `command` and register the worker.
    ///
    /// The child inherits the parent environment with `command.env` laid
    /// over it; stdin is closed and stdout/stderr are both captured. On Unix
    /// the child leads its own process group so a kill reaches anything it
    /// started as well.
    pub fn spawn(
        supervisor: &Arc<Supervisor>,
        name: impl Into<String>,
        command: &Command,
        ready_marker: &str,
    ) -> Result<Self> {
        let name = name.into();
        let program = command.program().ok_or(ShrinkwrapError::EmptyCommand)?;

        let mut cmd = std::process::Command::new(program);
        cmd.args(&command.argv[1..])
            .envs(command.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|source| ShrinkwrapError::SpawnError {
            program: program.to_string(),
            source,
        })?;
        let pid = child.id();

        let (tx, rx) = mpsc::channel();
        let readers = match attach_readers(&name, &mut child, &tx) {
            Ok(readers) => readers,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err.into());
            }
        };

        let registration = supervisor.register(&name, pid, tx);
        info!(worker = %name, pid, command = %command, "spawned child process");

        Ok(Self {
            child,
            events: rx,
            readers,
            registration,
            supervisor: Arc::clone(supervisor),
            ready_marker: ready_marker.to_string(),
            ready_sent: false,
            killed: false,
        })
    }

    pub fn info(&self) -> &WorkerInfo {
        self.registration.info()
    }

    /// Run the worker on its own named thread.
    pub fn start(self) -> io::Result<JoinHandle<WorkerExit>> {
        let thread_name = self.info().name.clone();
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || self.run())
    }

    /// Drive the child until both output streams are closed and the process
    /// has been reaped, then deregister.
    pub fn run(mut self) -> WorkerExit {
        let mut open_streams = self.readers.len();
        let mut lines = 0;

        while open_streams > 0 {
            self.kill_if_shutting_down();

            match self.events.recv() {
                Ok(WorkerEvent::Line { text, .. }) => {
                    lines += 1;
                    self.handle_line(&text);
                }
                Ok(WorkerEvent::Closed(stream)) => {
                    open_streams -= 1;
                    debug!(worker = %self.info().name, %stream, "output stream closed");
                }
                Ok(WorkerEvent::Wake) => {}
                Err(_) => break,
            }
        }

        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        let status = self.reap();

        let info = self.info().clone();
        info!(
            worker = %info.name,
            pid = info.pid,
            status = ?status,
            killed = self.killed,
            "process exited; joining worker"
        );

        let exit = WorkerExit {
            info,
            status,
            ready: self.ready_sent,
            killed: self.killed,
            lines,
        };
        self.registration.release();
        exit
    }

    fn handle_line(&mut self, text: &str) {
        self.supervisor.console().write_line(text);

        if !self.ready_sent && text.contains(&self.ready_marker) {
            self.ready_sent = true;
            if self.supervisor.notify(NotifyState::Ready) {
                info!(
                    worker = %self.info().name,
                    "sent READY=1; daemon should show as active/running"
                );
            }
        }
    }

    fn kill_if_shutting_down(&mut self) {
        if !self.killed && self.supervisor.is_shutting_down() {
            self.kill();
        }
    }

    /// Best-effort SIGKILL. The read loop keeps draining afterwards so no
    /// buffered output is lost.
    fn kill(&mut self) {
        self.killed = true;
        let pid = self.info().pid;
        info!(worker = %self.info().name, pid, "shutdown requested; killing child process");

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            match i32::try_from(pid) {
                Ok(raw) => match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                    Ok(()) => return,
                    Err(err) => {
                        debug!(pid, error = %err, "killing process group failed; killing child only")
                    }
                },
                Err(_) => debug!(pid, "pid out of range for a process group"),
            }
        }

        if let Err(err) = self.child.kill() {
            warn!(worker = %self.info().name, pid, error = %err, "failed to kill child process");
        }
    }

    /// Wait for the child to exit. Its pipes are already closed, so the only
    /// events left are wake-ups; a child still alive when shutdown begins is
    /// killed here.
    fn reap(&mut self) -> Option<ExitStatus> {
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => {}
                Err(err) => {
                    warn!(worker = %self.info().name, error = %err, "failed to wait for child");
                    return None;
                }
            }

            self.kill_if_shutting_down();

            match self.events.recv_timeout(REAP_POLL_INTERVAL) {
                Ok(_) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return self.child.wait().ok(),
            }
        }
    }
}

fn attach_readers(
    name: &str,
    child: &mut Child,
    tx: &Sender<WorkerEvent>,
) -> io::Result<Vec<JoinHandle<()>>> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

    Ok(vec![
        spawn_line_reader(name, StreamKind::Stdout, stdout, tx.clone())?,
        spawn_line_reader(name, StreamKind::Stderr, stderr, tx.clone())?,
    ])
}
