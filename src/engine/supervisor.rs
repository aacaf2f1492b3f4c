// src/engine/supervisor.rs

//! Shared supervision context.
//!
//! One [`Supervisor`] is built per run and handed (as `Arc`) to every worker
//! and to the controller. The shutdown flag and the worker registry live
//! behind a single mutex; console output has its own lock inside
//! [`ConsoleSink`]. Nothing is logged while the state lock is held, because
//! log events also take the console lock.

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::console::ConsoleSink;
use crate::exec::WorkerEvent;
use crate::notify::{Notifier, NotifyState};

pub type WorkerId = u64;

/// Identity of a registered worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    pub id: WorkerId,
    pub name: String,
    pub pid: u32,
}

struct RegisteredWorker {
    info: WorkerInfo,
    wake: Sender<WorkerEvent>,
}

#[derive(Default)]
struct SharedState {
    shutdown: bool,
    next_id: WorkerId,
    workers: BTreeMap<WorkerId, RegisteredWorker>,
}

pub struct Supervisor {
    state: Mutex<SharedState>,
    console: ConsoleSink,
    notifier: Arc<dyn Notifier>,
    service_name: String,
    drained: Notify,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("service_name", &self.service_name)
            .field("workers", &self.worker_count())
            .field("shutdown", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(
        console: ConsoleSink,
        notifier: Arc<dyn Notifier>,
        service_name: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SharedState::default()),
            console,
            notifier,
            service_name: service_name.into(),
            drained: Notify::new(),
        })
    }

    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutdown
    }

    /// Flip the shutdown flag and wake every registered worker so it can
    /// observe it. Returns true only for the call that made the transition.
    pub fn request_shutdown(&self) -> bool {
        let woken = {
            let mut state = self.lock();
            if state.shutdown {
                return false;
            }
            state.shutdown = true;
            // A worker whose receiver is already gone is finishing anyway.
            state
                .workers
                .values()
                .filter(|w| w.wake.send(WorkerEvent::Wake).is_ok())
                .count()
        };
        debug!(woken, "shutdown flag set");
        true
    }

    /// Add a worker to the registry. The returned guard removes it again.
    pub fn register(
        self: &Arc<Self>,
        name: &str,
        pid: u32,
        wake: Sender<WorkerEvent>,
    ) -> Registration {
        let info = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            let info = WorkerInfo {
                id,
                name: name.to_string(),
                pid,
            };
            state.workers.insert(
                id,
                RegisteredWorker {
                    info: info.clone(),
                    wake,
                },
            );
            info
        };
        debug!(worker = %info.name, id = info.id, pid, "worker registered");

        Registration {
            supervisor: Arc::clone(self),
            info,
            active: true,
        }
    }

    fn deregister(&self, id: WorkerId) -> bool {
        let (removed, remaining) = {
            let mut state = self.lock();
            let removed = state.workers.remove(&id).is_some();
            (removed, state.workers.len())
        };
        if removed {
            debug!(id, remaining, "worker deregistered");
            if remaining == 0 {
                self.drained.notify_one();
            }
        }
        removed
    }

    /// Snapshot of the workers that have not finished yet.
    pub fn live_workers(&self) -> Vec<WorkerInfo> {
        self.lock()
            .workers
            .values()
            .map(|w| w.info.clone())
            .collect()
    }

    pub fn worker_count(&self) -> usize {
        self.lock().workers.len()
    }

    /// Resolves once the registry has become empty after at least one
    /// deregistration (possibly before this call).
    pub async fn drained(&self) {
        self.drained.notified().await
    }

    /// Send `state` to the init system. Failures are logged, never returned.
    pub fn notify(&self, state: NotifyState) -> bool {
        match self.notifier.notify(state) {
            Ok(()) => {
                info!(service = %self.service_name, %state, "notified init system");
                true
            }
            Err(err) => {
                warn!(service = %self.service_name, %state, error = %err, "failed to notify init system");
                false
            }
        }
    }
}

/// Registry membership of one worker; dropping it deregisters the worker.
#[derive(Debug)]
pub struct Registration {
    supervisor: Arc<Supervisor>,
    info: WorkerInfo,
    active: bool,
}

impl Registration {
    pub fn info(&self) -> &WorkerInfo {
        &self.info
    }

    /// Deregister now. Returns false if the worker was already gone.
    pub fn release(mut self) -> bool {
        self.active = false;
        self.supervisor.deregister(self.info.id)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.active {
            self.supervisor.deregister(self.info.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use crate::errors::Result;

    struct NullNotifier;

    impl Notifier for NullNotifier {
        fn notify(&self, _state: NotifyState) -> Result<()> {
            Ok(())
        }
    }

    fn supervisor() -> Arc<Supervisor> {
        Supervisor::new(ConsoleSink::new(std::io::sink()), Arc::new(NullNotifier), "test")
    }

    #[test]
    fn shutdown_transitions_once_and_wakes_workers() {
        let sup = supervisor();
        let (tx, rx) = mpsc::channel();
        let _reg = sup.register("httpd", 42, tx);

        assert!(!sup.is_shutting_down());
        assert!(sup.request_shutdown());
        assert!(!sup.request_shutdown());
        assert!(sup.is_shutting_down());

        assert!(matches!(rx.try_recv(), Ok(WorkerEvent::Wake)));
        assert!(rx.try_recv().is_err(), "second request must not wake again");
    }

    #[test]
    fn registration_guard_removes_worker() {
        let sup = supervisor();
        let (tx, _rx) = mpsc::channel();
        let a = sup.register("a", 1, tx.clone());
        let b = sup.register("b", 2, tx);
        assert_ne!(a.info().id, b.info().id);
        assert_eq!(sup.worker_count(), 2);

        assert!(a.release());
        assert_eq!(sup.live_workers(), vec![b.info().clone()]);

        drop(b);
        assert_eq!(sup.worker_count(), 0);
    }

    #[tokio::test]
    async fn drained_fires_after_last_worker_leaves() {
        let sup = supervisor();
        let (tx, _rx) = mpsc::channel();
        let reg = sup.register("a", 1, tx);
        reg.release();

        tokio::time::timeout(std::time::Duration::from_secs(1), sup.drained())
            .await
            .expect("drained should already have a stored permit");
    }
}
