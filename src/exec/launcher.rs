// src/exec/launcher.rs

//! Process launcher: turns an `ExecRequest` into a running child with its
//! stream pumps attached.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::errors::{ExecError, Result};
use crate::exec::command::CommandSpec;
use crate::exec::pump::{ResolvedSink, StreamPumps};
use crate::exec::request::{Environment, ExecRequest, OutputSink};
use crate::types::StdinMode;

/// A child process that has been started and whose output is being pumped.
#[derive(Debug)]
pub struct RunningProcess {
    pub command: CommandSpec,
    pub child: Child,
    pub pumps: StreamPumps,
}

impl RunningProcess {
    /// OS process id, if the child has not been reaped yet.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Start the process described by `request`.
///
/// Fails with `LaunchFailure` when the working directory is missing, the
/// output file cannot be opened, or the OS refuses to spawn the program.
pub async fn launch(request: &ExecRequest, drain_timeout: Duration) -> Result<RunningProcess> {
    let command = &request.command;

    debug!(cmd = %command, "Executing command line");

    if let Some(dir) = &request.working_dir {
        ensure_working_dir(dir).map_err(|e| ExecError::launch(command, e))?;
    }

    // A child allowed to outlive the host must not write into pipes whose
    // read ends die with the host's runtime.
    let (stdout, stderr, sink) = if request.outlives_host() {
        let (stdout, stderr) = direct_stdio(&request.output)
            .await
            .map_err(|e| ExecError::launch(command, e))?;
        (stdout, stderr, ResolvedSink::Inherit)
    } else {
        let sink = open_sink(&request.output)
            .await
            .map_err(|e| ExecError::launch(command, e))?;
        (Stdio::piped(), Stdio::piped(), sink)
    };

    let mut cmd = Command::new(command.program());
    cmd.args(command.args());

    if let Some(dir) = &request.working_dir {
        cmd.current_dir(dir);
    }

    if let Environment::Exact(vars) = &request.env {
        cmd.env_clear().envs(vars);
    }

    let stdin = match request.stdin {
        StdinMode::Inherit => Stdio::inherit(),
        StdinMode::Null => Stdio::null(),
    };

    // Only registered (async + cleanup) children die with their owner; every
    // other child may outlive a dropped handle.
    cmd.stdin(stdin)
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(request.wants_shutdown_cleanup());

    let mut child = cmd.spawn().map_err(|e| ExecError::launch(command, e))?;

    let pumps = StreamPumps::attach(&mut child, sink, command.to_string(), drain_timeout);

    debug!(cmd = %command, pid = ?child.id(), "process started");

    Ok(RunningProcess {
        command: command.clone(),
        child,
        pumps,
    })
}

fn ensure_working_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("working directory {} does not exist", dir.display()),
        ))
    }
}

/// Open the output sink that the pumps write into.
async fn open_sink(output: &OutputSink) -> io::Result<ResolvedSink> {
    match output {
        OutputSink::Inherit => Ok(ResolvedSink::Inherit),
        OutputSink::File(path) => Ok(ResolvedSink::file(create_output_file(path).await?)),
    }
}

/// Stdout/stderr handles given straight to the child, with no pump between.
async fn direct_stdio(output: &OutputSink) -> io::Result<(Stdio, Stdio)> {
    match output {
        OutputSink::Inherit => Ok((Stdio::inherit(), Stdio::inherit())),
        OutputSink::File(path) => {
            let stdout = create_output_file(path).await?.into_std().await;
            let stderr = stdout.try_clone()?;
            Ok((Stdio::from(stdout), Stdio::from(stderr)))
        }
    }
}

/// Create (truncate) the output file. A missing parent directory is
/// created; if that fails we only warn and let the open itself decide.
async fn create_output_file(path: &Path) -> io::Result<tokio::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "Could not create non existing parent directories for log file"
                );
            }
        }
    }

    tokio::fs::File::create(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_sink_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c/out.log");

        let sink = open_sink(&OutputSink::File(path.clone())).await.unwrap();
        assert!(matches!(sink, ResolvedSink::File(_)));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn open_sink_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = open_sink(&OutputSink::File(blocker.join("out.log"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn direct_stdio_opens_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/detached.log");
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(&path, b"stale").unwrap();

        direct_stdio(&OutputSink::File(path.clone())).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn missing_working_dir_is_not_found() {
        let err = ensure_working_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
