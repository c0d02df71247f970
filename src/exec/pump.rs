// src/exec/pump.rs

//! Stream pumps copying a child's stdout/stderr into the configured sink.
//!
//! Pumps are spawned as Tokio tasks right after the child starts so its pipe
//! buffers never fill up while nobody is reading. Stopping the pumps waits for
//! both pipes to reach EOF (bounded by a drain timeout) and flushes the sink,
//! so once [`StreamPumps::stop`] returns every byte the child wrote has been
//! delivered.

use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::process::Child;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::errors::{ExecError, Result};

/// How long `stop` waits for the pipes to close after the child exited.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const CHUNK_SIZE: usize = 8 * 1024;

/// Output sink after it has been opened.
#[derive(Debug, Clone)]
pub enum ResolvedSink {
    /// Caller's stdout / stderr, flushed after every chunk.
    Inherit,
    /// A single buffered file shared by both pumps.
    File(Arc<Mutex<BufWriter<File>>>),
}

impl ResolvedSink {
    pub fn file(file: File) -> Self {
        ResolvedSink::File(Arc::new(Mutex::new(BufWriter::new(file))))
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn name(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Running pump tasks for one child process.
#[derive(Debug)]
pub struct StreamPumps {
    command: String,
    sink: ResolvedSink,
    tasks: Vec<(&'static str, JoinHandle<std::io::Result<u64>>)>,
    drain_timeout: Duration,
}

impl StreamPumps {
    /// Take the child's stdout/stderr pipes and start pumping them into
    /// `sink`. Pipes that were not configured as piped are skipped.
    pub fn attach(
        child: &mut Child,
        sink: ResolvedSink,
        command: impl Into<String>,
        drain_timeout: Duration,
    ) -> Self {
        let command = command.into();
        let mut tasks = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            tasks.push((
                Stream::Stdout.name(),
                tokio::spawn(pump(stdout, sink.clone(), Stream::Stdout)),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tasks.push((
                Stream::Stderr.name(),
                tokio::spawn(pump(stderr, sink.clone(), Stream::Stderr)),
            ));
        }

        debug!(cmd = %command, pumps = tasks.len(), "stream pumps attached");

        Self {
            command,
            sink,
            tasks,
            drain_timeout,
        }
    }

    /// Wait for every pump to hit EOF, then flush the sink.
    ///
    /// Pumps that are still running once the drain timeout has elapsed are
    /// aborted. All
    /// problems are collected into a single `StreamTeardown` error; the sink
    /// is flushed regardless.
    pub async fn stop(self) -> Result<()> {
        let StreamPumps {
            command,
            sink,
            tasks,
            drain_timeout,
        } = self;

        let mut problems: Vec<String> = Vec::new();
        // One deadline shared by all pumps, not one timeout each.
        let deadline = Instant::now() + drain_timeout;

        for (stream, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(Ok(bytes))) => {
                    trace!(cmd = %command, stream, bytes, "stream pump finished");
                }
                Ok(Ok(Err(e))) => problems.push(format!("{stream}: {e}")),
                Ok(Err(join_err)) => problems.push(format!("{stream}: {join_err}")),
                Err(_) => {
                    handle.abort();
                    problems.push(format!(
                        "{stream}: pipe still open {}ms after process exit",
                        drain_timeout.as_millis()
                    ));
                }
            }
        }

        if let ResolvedSink::File(file) = &sink {
            let mut writer = file.lock().await;
            if let Err(e) = writer.flush().await {
                problems.push(format!("flushing output file: {e}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ExecError::StreamTeardown {
                command,
                reason: problems.join("; "),
            })
        }
    }
}

async fn pump<R>(mut reader: R, sink: ResolvedSink, stream: Stream) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        write_chunk(&sink, stream, &buf[..n]).await?;
        total += n as u64;
    }

    if let ResolvedSink::File(file) = &sink {
        file.lock().await.flush().await?;
    }

    Ok(total)
}

async fn write_chunk(sink: &ResolvedSink, stream: Stream, chunk: &[u8]) -> std::io::Result<()> {
    match sink {
        // Unbuffered on purpose: inherited output must show up as it happens.
        ResolvedSink::Inherit => match stream {
            Stream::Stdout => {
                let mut out = tokio::io::stdout();
                out.write_all(chunk).await?;
                out.flush().await
            }
            Stream::Stderr => {
                let mut err = tokio::io::stderr();
                err.write_all(chunk).await?;
                err.flush().await
            }
        },
        ResolvedSink::File(file) => file.lock().await.write_all(chunk).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pump_copies_everything_into_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let sink = ResolvedSink::file(File::create(&path).await.unwrap());

        let data: &[u8] = b"first line\nsecond line\n";
        let copied = pump(data, sink.clone(), Stream::Stdout).await.unwrap();
        assert_eq!(copied, data.len() as u64);

        assert_eq!(tokio::fs::read(&path).await.unwrap(), data);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn held_open_pipes_end_in_stream_teardown() {
        let mut child = tokio::process::Command::new("sh")
            .args(["-c", "sleep 3 & exit 0"])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();

        let drain = Duration::from_millis(200);
        let pumps = StreamPumps::attach(&mut child, ResolvedSink::Inherit, "sh", drain);
        assert!(child.wait().await.unwrap().success());

        let started = std::time::Instant::now();
        let err = pumps.stop().await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            ExecError::StreamTeardown { command, reason } => {
                assert_eq!(command, "sh");
                assert!(reason.contains("stdout: pipe still open"), "reason was {reason}");
                assert!(reason.contains("stderr: pipe still open"), "reason was {reason}");
            }
            other => panic!("expected StreamTeardown, got {other:?}"),
        }
        assert!(elapsed < drain + Duration::from_millis(150), "took {elapsed:?}");
    }
}
