// src/exec/command.rs

//! Resolved command lines.

use std::fmt;

use crate::errors::{ExecError, Result};

/// Program path plus arguments, exactly as they will be handed to the OS.
///
/// No shell is involved: there is no globbing, piping or variable expansion.
/// A `CommandSpec` is always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
}

impl CommandSpec {
    /// Build from an argument vector. The first element is the program.
    pub fn new<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        match argv.first() {
            None => Err(ExecError::InvalidCommand("command line is empty".to_string())),
            Some(program) if program.trim().is_empty() => Err(ExecError::InvalidCommand(
                "program name is empty".to_string(),
            )),
            Some(_) => Ok(Self { argv }),
        }
    }

    /// Split a single command-line string into words using POSIX shell
    /// quoting rules (quotes and backslash escapes only).
    pub fn parse(line: &str) -> Result<Self> {
        let words = shlex::split(line).ok_or_else(|| {
            ExecError::InvalidCommand(format!("unbalanced quotes in command line: {line}"))
        })?;
        Self::new(words)
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Words containing NUL cannot be quoted; fall back to a plain join.
        match shlex::try_join(self.argv.iter().map(String::as_str)) {
            Ok(line) => f.write_str(&line),
            Err(_) => f.write_str(&self.argv.join(" ")),
        }
    }
}
