// src/errors.rs

//! Crate-wide error type and `Result` alias.
//!
//! Synchronous executions surface every failure as one of these variants.
//! Detached executions only ever return `InvalidCommand` or `LaunchFailure`;
//! anything that happens after the child is running is logged instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    /// Empty or unparsable command; nothing was started.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// The OS could not create or run the process (missing executable,
    /// permissions, output file, working directory, ...).
    #[error("Command execution failed for {command}: {source}")]
    LaunchFailure {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited with a code outside the success set.
    #[error("Result of {command} execution is: '{code}'.")]
    NonZeroExit { code: i32, command: String },

    /// A stream pump could not be stopped cleanly after completion.
    #[error("Error stopping stream pumps for {command}: {reason}")]
    StreamTeardown { command: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecError {
    pub fn launch(command: impl ToString, source: std::io::Error) -> Self {
        ExecError::LaunchFailure {
            command: command.to_string(),
            source,
        }
    }

    /// Exit code carried by a `NonZeroExit`, if this is one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;
