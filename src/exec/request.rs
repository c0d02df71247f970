// src/exec/request.rs

//! Everything the supervisor needs to know to run one command.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::exec::command::CommandSpec;
use crate::exec::success::SuccessCodes;
use crate::types::{ExecutionMode, StdinMode};

/// Environment handed to the child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    /// The child sees exactly the caller's environment.
    #[default]
    Inherit,
    /// The child sees exactly this map and nothing else.
    Exact(HashMap<String, String>),
}

impl Environment {
    /// Caller's environment with `overlay` applied on top.
    pub fn inherited_with<I, K, V>(overlay: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut vars: HashMap<String, String> = std::env::vars().collect();
        for (k, v) in overlay {
            vars.insert(k.into(), v.into());
        }
        Environment::Exact(vars)
    }
}

/// Destination for the child's stdout and stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputSink {
    /// Forward to the caller's own stdout / stderr.
    #[default]
    Inherit,
    /// Write stdout and stderr, interleaved, into one file (truncated).
    File(PathBuf),
}

/// A fully resolved execution request.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub command: CommandSpec,
    /// `None` runs in the caller's current directory.
    pub working_dir: Option<PathBuf>,
    pub env: Environment,
    pub output: OutputSink,
    pub stdin: StdinMode,
    pub success_codes: SuccessCodes,
    pub mode: ExecutionMode,
    /// Only meaningful for `ExecutionMode::Async`.
    pub cleanup_on_shutdown: bool,
}

impl ExecRequest {
    /// Synchronous request with every other knob at its default.
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            working_dir: None,
            env: Environment::Inherit,
            output: OutputSink::Inherit,
            stdin: StdinMode::Inherit,
            success_codes: SuccessCodes::default(),
            mode: ExecutionMode::Sync,
            cleanup_on_shutdown: true,
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = OutputSink::File(path.into());
        self
    }

    pub fn stdin(mut self, stdin: StdinMode) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn success_codes(mut self, codes: SuccessCodes) -> Self {
        self.success_codes = codes;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn cleanup_on_shutdown(mut self, cleanup: bool) -> Self {
        self.cleanup_on_shutdown = cleanup;
        self
    }

    /// True when this request must be tracked by the shutdown registry.
    pub fn wants_shutdown_cleanup(&self) -> bool {
        self.mode.is_async() && self.cleanup_on_shutdown
    }

    /// True when the child may keep running after the host is gone. Such a
    /// child gets its output handles directly instead of host-side pipes.
    pub fn outlives_host(&self) -> bool {
        self.mode.is_async() && !self.cleanup_on_shutdown
    }
}
