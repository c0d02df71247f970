// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::errors::Result;
use crate::exec::{CommandSpec, Environment, ExecRequest, SuccessCodes};
use crate::types::ExecutionMode;

/// Command-line arguments for `execkit`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "execkit",
    version,
    about = "Run commands as supervised child processes, in the foreground or detached.",
    long_about = None
)]
pub struct CliArgs {
    /// Run the steps of this plan file (TOML) instead of an inline command.
    #[arg(long, value_name = "PATH", conflicts_with = "command")]
    pub config: Option<PathBuf>,

    /// Working directory for the inline command.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Write the inline command's stdout and stderr to this file.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Set an environment variable for the inline command (repeatable).
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Start the inline command with only the `--env` variables.
    #[arg(long)]
    pub clear_env: bool,

    /// Exit code that counts as success (repeatable). Default: only 0.
    #[arg(
        short = 's',
        long = "success-code",
        value_name = "CODE",
        allow_negative_numbers = true
    )]
    pub success_codes: Vec<i32>,

    /// Detach from the inline command instead of waiting for it.
    #[arg(long = "async")]
    pub detach: bool,

    /// Let detached commands keep running after execkit exits.
    #[arg(long)]
    pub no_cleanup_on_shutdown: bool,

    /// Before exiting, wait for detached commands to finish on their own.
    #[arg(long)]
    pub wait_detached: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `EXECKIT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the plan, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Inline command to run, after `--`.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Build the request for the inline command (`-- prog args...`).
    ///
    /// Fails with `InvalidCommand` when no command was given.
    pub fn inline_request(&self) -> Result<ExecRequest> {
        let command = CommandSpec::new(self.command.iter().cloned())?;

        let env = if self.clear_env {
            Environment::Exact(self.env.iter().cloned().collect())
        } else if self.env.is_empty() {
            Environment::Inherit
        } else {
            Environment::inherited_with(self.env.iter().cloned())
        };

        let mode = if self.detach {
            ExecutionMode::Async
        } else {
            ExecutionMode::Sync
        };

        let mut request = ExecRequest::new(command)
            .env(env)
            .mode(mode)
            .success_codes(SuccessCodes::new(self.success_codes.iter().copied()))
            .cleanup_on_shutdown(!self.no_cleanup_on_shutdown);

        request.working_dir = self.workdir.clone();
        if let Some(path) = &self.output_file {
            request = request.output_file(path.clone());
        }

        Ok(request)
    }
}

fn parse_env_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
