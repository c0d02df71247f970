// src/exec/registry.rs

//! Shutdown registry for detached child processes.
//!
//! The registry never owns a child. Each entry only holds the sending half of
//! a termination channel; the observer task that owns the `Child` listens on
//! the other half and kills the process when asked. Entries exist exactly
//! between process start and completion (or termination).
//!
//! All membership changes go through one `Mutex`, which is never held across
//! an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Reply channel handed to the owner of a child when termination is
/// requested. The owner answers with the outcome of the kill.
pub type TerminateAck = oneshot::Sender<std::io::Result<()>>;

/// Identifier of one registered process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Entry {
    command: String,
    pid: Option<u32>,
    terminate: oneshot::Sender<TerminateAck>,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<ProcessId, Entry>>,
}

/// Tracks running detached processes that must be killed when the host
/// shuts down.
///
/// Cheap to clone; all clones share the same membership set. Construct one
/// per host process (or per test) and inject it into the `Executor`.
#[derive(Clone, Default)]
pub struct ShutdownRegistry {
    inner: Arc<Inner>,
}

impl fmt::Debug for ShutdownRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownRegistry")
            .field("registered", &self.len())
            .finish()
    }
}

/// Owner-side half of a registration.
#[derive(Debug)]
pub struct Registration {
    id: ProcessId,
    terminate_rx: oneshot::Receiver<TerminateAck>,
}

impl Registration {
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Resolves once the registry asks for termination.
    ///
    /// Returns `None` if the request can never arrive (the entry was removed
    /// or the registry was dropped).
    pub async fn terminate_requested(&mut self) -> Option<TerminateAck> {
        (&mut self.terminate_rx).await.ok()
    }
}

/// Summary of one shutdown pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Processes killed by this pass.
    pub terminated: usize,
    /// Entries whose process finished before it could be killed.
    pub already_exited: usize,
    /// Kill attempts that returned an error.
    pub failed: usize,
}

impl ShutdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ProcessId, Entry>> {
        // A poisoned lock only means another thread panicked mid-update; the
        // map itself is still consistent.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a running process.
    pub fn register(&self, command: impl Into<String>, pid: Option<u32>) -> Registration {
        let id = ProcessId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (terminate, terminate_rx) = oneshot::channel();
        let command = command.into();

        debug!(id = %id, ?pid, cmd = %command, "registering process for shutdown cleanup");

        self.entries().insert(
            id,
            Entry {
                command,
                pid,
                terminate,
            },
        );

        Registration { id, terminate_rx }
    }

    /// Remove a process. Removing an unknown or already removed id is a
    /// no-op; returns whether something was removed.
    pub fn deregister(&self, id: ProcessId) -> bool {
        let removed = self.entries().remove(&id).is_some();
        if removed {
            debug!(id = %id, "deregistered process from shutdown cleanup");
        }
        removed
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.entries().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forcibly terminate every process still registered.
    ///
    /// Best effort: every entry gets a termination request before any reply
    /// is awaited, and one failing kill does not stop the others. The set is
    /// empty afterwards, so running the pass again is harmless.
    pub async fn run_shutdown_pass(&self) -> ShutdownReport {
        let drained: Vec<(ProcessId, Entry)> = self.entries().drain().collect();
        let mut report = ShutdownReport::default();

        if drained.is_empty() {
            debug!("shutdown pass: no registered processes");
            return report;
        }

        info!(count = drained.len(), "shutdown pass: terminating detached processes");

        let mut pending = Vec::with_capacity(drained.len());
        for (id, entry) in drained {
            let (ack_tx, ack_rx) = oneshot::channel();
            if entry.terminate.send(ack_tx).is_err() {
                debug!(id = %id, cmd = %entry.command, "process already finished");
                report.already_exited += 1;
                continue;
            }
            pending.push((id, entry.command, entry.pid, ack_rx));
        }

        for (id, command, pid, ack_rx) in pending {
            match ack_rx.await {
                Ok(Ok(())) => {
                    info!(id = %id, ?pid, cmd = %command, "terminated process on shutdown");
                    report.terminated += 1;
                }
                Ok(Err(e)) => {
                    warn!(
                        id = %id,
                        ?pid,
                        cmd = %command,
                        error = %e,
                        "failed to terminate process on shutdown"
                    );
                    report.failed += 1;
                }
                Err(_) => {
                    debug!(id = %id, cmd = %command, "process finished before termination");
                    report.already_exited += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stand-in for the observer task: waits for a termination request and
    /// answers it with `result`.
    fn spawn_owner(
        mut registration: Registration,
        result: std::io::Result<()>,
    ) -> tokio::task::JoinHandle<bool> {
        tokio::spawn(async move {
            match registration.terminate_requested().await {
                Some(ack) => {
                    let _ = ack.send(result);
                    true
                }
                None => false,
            }
        })
    }

    #[test]
    fn deregister_is_idempotent() {
        let registry = ShutdownRegistry::new();
        let reg = registry.register("sleep 10", Some(42));
        assert!(registry.contains(reg.id()));
        assert_eq!(registry.len(), 1);

        assert!(registry.deregister(reg.id()));
        assert!(!registry.deregister(reg.id()));
        assert!(registry.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let registry = ShutdownRegistry::new();
        let a = registry.register("a", None);
        let b = registry.register("b", None);
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn shutdown_pass_terminates_only_registered_entries() {
        let registry = ShutdownRegistry::new();

        let owners: Vec<_> = (0..3)
            .map(|i| spawn_owner(registry.register(format!("job {i}"), None), Ok(())))
            .collect();

        let gone = registry.register("gone", None);
        registry.deregister(gone.id());
        let gone_owner = spawn_owner(gone, Ok(()));

        let report = registry.run_shutdown_pass().await;
        assert_eq!(report.terminated, 3);
        assert_eq!(report.failed, 0);
        assert!(registry.is_empty());

        for owner in owners {
            assert!(owner.await.unwrap());
        }
        // The deregistered owner never got a request.
        assert!(!gone_owner.await.unwrap());
    }

    #[tokio::test]
    async fn one_failed_kill_does_not_stop_the_rest() {
        let registry = ShutdownRegistry::new();
        let failing = spawn_owner(
            registry.register("stubborn", None),
            Err(std::io::Error::other("permission denied")),
        );
        let ok = spawn_owner(registry.register("polite", None), Ok(()));

        let report = registry.run_shutdown_pass().await;
        assert_eq!(report.terminated, 1);
        assert_eq!(report.failed, 1);

        failing.await.unwrap();
        ok.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_owner_counts_as_already_exited() {
        let registry = ShutdownRegistry::new();
        drop(registry.register("finished", None));

        let report = registry.run_shutdown_pass().await;
        assert_eq!(report, ShutdownReport {
            terminated: 0,
            already_exited: 1,
            failed: 0,
        });

        // Second pass finds nothing.
        assert_eq!(registry.run_shutdown_pass().await, ShutdownReport::default());
    }
}
