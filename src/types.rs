// src/types.rs

use std::str::FromStr;
use serde::Deserialize;

/// Whether the caller waits for the child or detaches from it.
///
/// - `Sync`: block until the process exits, then classify its exit code
///   (default behaviour).
/// - `Async`: return as soon as the process is running; completion is only
///   observed in the background and reported through logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sync,
    Async,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Sync
    }
}

impl ExecutionMode {
    pub fn is_async(self) -> bool {
        matches!(self, ExecutionMode::Async)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "synchronous" => Ok(ExecutionMode::Sync),
            "async" | "asynchronous" => Ok(ExecutionMode::Async),
            other => Err(format!(
                "invalid execution mode: {other} (expected \"sync\" or \"async\")"
            )),
        }
    }
}

/// Where the child's standard input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdinMode {
    /// Share the caller's stdin with the child.
    Inherit,
    /// Give the child an empty stdin.
    Null,
}

impl Default for StdinMode {
    fn default() -> Self {
        StdinMode::Inherit
    }
}

impl FromStr for StdinMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Ok(StdinMode::Inherit),
            "null" => Ok(StdinMode::Null),
            other => Err(format!(
                "invalid stdin mode: {other} (expected \"inherit\" or \"null\")"
            )),
        }
    }
}
