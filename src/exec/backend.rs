// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The plan runner talks to an `ExecutorBackend` instead of the supervisor
//! directly, so tests can swap in a fake that records requests and returns
//! canned outcomes without spawning anything.
//!
//! - [`Executor`] is the production implementation.
//! - Tests provide their own backend (see the `execkit-test-utils` crate).

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::exec::completion::{Execution, Executor};
use crate::exec::registry::ShutdownReport;
use crate::exec::request::ExecRequest;

/// Trait abstracting how execution requests are carried out.
pub trait ExecutorBackend: Send {
    /// Run (or start, for async requests) one request.
    fn execute<'a>(
        &'a mut self,
        request: &'a ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Execution>> + Send + 'a>>;

    /// Terminate whatever detached work is still tracked for cleanup.
    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ShutdownReport> + Send + '_>>;
}

impl ExecutorBackend for Executor {
    fn execute<'a>(
        &'a mut self,
        request: &'a ExecRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Execution>> + Send + 'a>> {
        Box::pin(Executor::execute(self, request))
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = ShutdownReport> + Send + '_>> {
        let registry = self.registry().clone();
        Box::pin(async move { registry.run_shutdown_pass().await })
    }
}
