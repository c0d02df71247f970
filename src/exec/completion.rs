// src/exec/completion.rs

//! Completion strategy: block on the child (sync) or hand it to a background
//! observer (async).

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::errors::{ExecError, Result};
use crate::exec::launcher::{self, RunningProcess};
use crate::exec::pump::{DEFAULT_DRAIN_TIMEOUT, StreamPumps};
use crate::exec::registry::{Registration, ShutdownRegistry};
use crate::exec::request::ExecRequest;
use crate::exec::success::{SuccessCodes, exit_code};
use crate::types::ExecutionMode;

/// Final state of a detached process, published exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The process exited on its own with this code. Not classified.
    Exited(i32),
    /// The process was killed by the shutdown registry.
    Terminated,
    /// The process could not be tracked to completion.
    Failed(String),
}

/// Receiving end of a detached execution's completion channel.
#[derive(Debug)]
pub struct CompletionHandle {
    command: String,
    rx: oneshot::Receiver<Completion>,
}

impl CompletionHandle {
    /// New completion channel for `command`. The sender must be used at most
    /// once; dropping it unused reports `Completion::Failed`.
    pub fn channel(command: impl Into<String>) -> (oneshot::Sender<Completion>, Self) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            command: command.into(),
            rx,
        };
        (tx, handle)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Wait for the observer to publish the outcome.
    pub async fn wait(self) -> Completion {
        self.rx.await.unwrap_or_else(|_| {
            Completion::Failed("observer stopped before reporting an outcome".to_string())
        })
    }
}

/// What the caller gets back from [`Executor::execute`].
#[derive(Debug)]
pub enum Execution {
    /// Synchronous run finished with an accepted exit code.
    Completed { exit_code: i32 },
    /// Asynchronous run is in flight; the handle reports how it ends.
    Detached(CompletionHandle),
}

impl Execution {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Execution::Completed { exit_code } => Some(*exit_code),
            Execution::Detached(_) => None,
        }
    }

    pub fn into_detached(self) -> Option<CompletionHandle> {
        match self {
            Execution::Detached(handle) => Some(handle),
            Execution::Completed { .. } => None,
        }
    }
}

/// Process supervisor.
///
/// Holds the shutdown registry that detached processes with
/// `cleanup_on_shutdown` are tracked in. Cloning shares the registry.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: ShutdownRegistry,
    drain_timeout: Duration,
}

impl Executor {
    pub fn new(registry: ShutdownRegistry) -> Self {
        Self {
            registry,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Bound on how long stream pumps may keep draining after exit.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn registry(&self) -> &ShutdownRegistry {
        &self.registry
    }

    /// Launch `request` and complete it according to its execution mode.
    ///
    /// Launch failures are returned in both modes. After a successful
    /// launch, async mode never returns an error.
    pub async fn execute(&self, request: &ExecRequest) -> Result<Execution> {
        let process = launcher::launch(request, self.drain_timeout)
            .await
            .inspect_err(|e| error!(cmd = %request.command, error = %e, "Command execution failed."))?;

        match request.mode {
            ExecutionMode::Sync => {
                let exit_code = self.complete_sync(process, &request.success_codes).await?;
                Ok(Execution::Completed { exit_code })
            }
            ExecutionMode::Async => {
                let handle = self.detach(process, request.cleanup_on_shutdown);
                Ok(Execution::Detached(handle))
            }
        }
    }

    /// Block until the child exits, drain its output, then classify.
    async fn complete_sync(
        &self,
        process: RunningProcess,
        success_codes: &SuccessCodes,
    ) -> Result<i32> {
        let RunningProcess {
            command,
            mut child,
            pumps,
        } = process;

        let waited = child.wait().await;

        // Output must be fully delivered before the caller sees the outcome.
        if let Err(e) = pumps.stop().await {
            error!(cmd = %command, error = %e, "Error stopping stream handler");
        }

        let status = waited.map_err(|e| {
            error!(cmd = %command, error = %e, "Command execution failed.");
            ExecError::launch(&command, e)
        })?;

        let code = exit_code(&status);
        if success_codes.is_failure(code) {
            let err = ExecError::NonZeroExit {
                code,
                command: command.to_string(),
            };
            error!(cmd = %command, exit_code = code, "{err}");
            return Err(err);
        }

        info!(cmd = %command, exit_code = code, "process completed");
        Ok(code)
    }

    /// Hand the child to a background observer and return immediately.
    fn detach(&self, process: RunningProcess, cleanup_on_shutdown: bool) -> CompletionHandle {
        let command = process.command.to_string();
        let registration = cleanup_on_shutdown
            .then(|| self.registry.register(command.clone(), process.pid()));

        let (tx, handle) = CompletionHandle::channel(command);
        let registry = self.registry.clone();

        tokio::spawn(observe(process, registration, registry, tx));

        handle
    }
}

enum Ending {
    Exited(io::Result<ExitStatus>),
    Terminated(io::Result<()>),
}

/// Background observer for one detached process.
///
/// Waits for natural exit or a termination request, leaves the registry,
/// logs the outcome, stops the pumps and publishes to `tx`.
async fn observe(
    process: RunningProcess,
    registration: Option<Registration>,
    registry: ShutdownRegistry,
    tx: oneshot::Sender<Completion>,
) {
    let RunningProcess {
        command,
        mut child,
        pumps,
    } = process;

    let id = registration.as_ref().map(Registration::id);
    let ending = wait_or_terminate(&mut child, registration).await;

    if let Some(id) = id {
        registry.deregister(id);
    }

    let completion = match ending {
        Ending::Exited(Ok(status)) => {
            let code = exit_code(&status);
            info!(cmd = %command, exit_code = code, "Async process complete, exit value = {code}");
            Completion::Exited(code)
        }
        Ending::Exited(Err(e)) => {
            error!(cmd = %command, error = %e, "Async process failed");
            Completion::Failed(e.to_string())
        }
        Ending::Terminated(Ok(())) => {
            info!(cmd = %command, "Async process terminated on shutdown");
            Completion::Terminated
        }
        Ending::Terminated(Err(e)) => {
            error!(cmd = %command, error = %e, "Async process could not be terminated");
            Completion::Failed(format!("termination failed: {e}"))
        }
    };

    stop_pumps_logged(pumps, &command.to_string()).await;

    // Nobody listening is fine: fire and forget.
    let _ = tx.send(completion);
}

/// Wait for the child, or kill it if the registry asks first.
///
/// Consumes the registration so its channel closes as soon as this returns;
/// a shutdown pass racing with natural exit then sees "already exited"
/// instead of waiting on us.
async fn wait_or_terminate(child: &mut Child, registration: Option<Registration>) -> Ending {
    let Some(mut registration) = registration else {
        return Ending::Exited(child.wait().await);
    };

    tokio::select! {
        status = child.wait() => Ending::Exited(status),
        request = registration.terminate_requested() => match request {
            Some(ack) => {
                let killed = child.kill().await;
                let reply = match &killed {
                    Ok(()) => Ok(()),
                    Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
                };
                let _ = ack.send(reply);
                Ending::Terminated(killed)
            }
            // Registry gone: nobody can terminate us any more.
            None => Ending::Exited(child.wait().await),
        },
    }
}

async fn stop_pumps_logged(pumps: StreamPumps, command: &str) {
    if let Err(e) = pumps.stop().await {
        error!(cmd = %command, error = %e, "Error stopping async process stream handler");
    }
}
