// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches child processes with `tokio::process::Command`,
//! pumps their output, and decides how the caller observes completion.
//!
//! - [`command`] holds the resolved program + arguments (`CommandSpec`).
//! - [`request`] bundles everything needed to run one command.
//! - [`success`] classifies exit codes against a success set.
//! - [`launcher`] spawns the child and attaches the [`pump`]s.
//! - [`completion`] owns the sync / async completion strategy (`Executor`).
//! - [`registry`] tracks detached children that must die with the host.
//! - [`backend`] provides the `ExecutorBackend` trait the plan runner uses,
//!   which tests can replace with a fake implementation.

pub mod backend;
pub mod command;
pub mod completion;
pub mod launcher;
pub mod pump;
pub mod registry;
pub mod request;
pub mod success;

pub use backend::ExecutorBackend;
pub use command::CommandSpec;
pub use completion::{Completion, CompletionHandle, Execution, Executor};
pub use registry::{ShutdownRegistry, ShutdownReport};
pub use request::{Environment, ExecRequest, OutputSink};
pub use success::{SuccessCodes, is_failure};
