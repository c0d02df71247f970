use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use execkit::errors::{ExecError, Result};
use execkit::exec::{
    Completion, CompletionHandle, Execution, ExecRequest, ExecutorBackend, ShutdownReport,
};

/// Scripted result for one program.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Behave like a process exiting with this code (classified for sync
    /// requests, reported through the handle for async ones).
    Exit(i32),
    /// Fail to launch.
    LaunchError,
}

/// A fake executor that:
/// - records the command line of every request it gets
/// - answers from a per-program script (default: exit 0)
/// - counts shutdown passes.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    executed: Arc<Mutex<Vec<String>>>,
    script: HashMap<String, FakeOutcome>,
    shutdowns: Arc<AtomicUsize>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for requests whose program is `program`.
    pub fn on(mut self, program: &str, outcome: FakeOutcome) -> Self {
        self.script.insert(program.to_string(), outcome);
        self
    }

    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    pub fn shutdowns(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.shutdowns)
    }

    fn answer(&self, request: &ExecRequest) -> Result<Execution> {
        let command = request.command.to_string();
        self.executed.lock().unwrap().push(command.clone());

        let outcome = self
            .script
            .get(request.command.program())
            .cloned()
            .unwrap_or(FakeOutcome::Exit(0));

        match outcome {
            FakeOutcome::LaunchError => Err(ExecError::launch(
                &command,
                std::io::Error::new(std::io::ErrorKind::NotFound, "fake: no such program"),
            )),
            FakeOutcome::Exit(code) if request.mode.is_async() => {
                let (tx, handle) = CompletionHandle::channel(command);
                let _ = tx.send(Completion::Exited(code));
                Ok(Execution::Detached(handle))
            }
            FakeOutcome::Exit(code) if request.success_codes.is_failure(code) => {
                Err(ExecError::NonZeroExit { code, command })
            }
            FakeOutcome::Exit(code) => Ok(Execution::Completed { exit_code: code }),
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn execute<'a>(
        &'a mut self,
        request: &'a ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Execution>> + Send + 'a>> {
        let result = self.answer(request);
        Box::pin(async move { result })
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ShutdownReport> + Send + '_>> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { ShutdownReport::default() })
    }
}
