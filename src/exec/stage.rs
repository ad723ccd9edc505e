// src/exec/stage.rs

//! Per-stage lifecycle: status tracking, supervision, stream forwarding and
//! the first-stage kill switch.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::sink::SharedSink;
use crate::exec::spawner::{exit_code, ProcessHandle};

/// Lifecycle of one pipeline stage.
///
/// `Spawned -> Running -> Exited`, or `Spawned -> FailedToStart`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Spawned,
    Running { pid: Option<u32> },
    FailedToStart { error: String },
    Exited { code: i32 },
}

impl StageStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            StageStatus::FailedToStart { .. } | StageStatus::Exited { .. }
        )
    }
}

/// Shared view of every stage's [`StageStatus`] for one pipeline.
#[derive(Debug, Clone)]
pub struct StageBoard {
    stages: Arc<Mutex<Vec<StageStatus>>>,
}

impl StageBoard {
    pub fn new(len: usize) -> Self {
        Self {
            stages: Arc::new(Mutex::new(vec![StageStatus::Spawned; len])),
        }
    }

    pub fn snapshot(&self) -> Vec<StageStatus> {
        self.lock().clone()
    }

    pub fn get(&self, index: usize) -> Option<StageStatus> {
        self.lock().get(index).cloned()
    }

    pub(crate) fn set(&self, index: usize, status: StageStatus) {
        if let Some(slot) = self.lock().get_mut(index) {
            debug!(stage = index, from = ?slot, to = ?status, "stage transition");
            *slot = status;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StageStatus>> {
        // A panicking writer cannot leave a half-written status behind.
        self.stages.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One-shot request to kill the first stage of a pipeline.
///
/// Cloned into every observer of a single pipeline. Triggering more than once,
/// or after the first stage has already exited, does nothing.
#[derive(Debug, Clone)]
pub struct KillSwitch {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl KillSwitch {
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Request termination of the first stage. Returns `true` only for the
    /// call that actually delivered the request.
    pub fn trigger(&self) -> bool {
        let sender = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Own `handle` until it exits and record the result on `board`.
///
/// The first stage also receives the kill switch receiver; when it fires the
/// process is killed. A dropped switch is not a kill request.
pub(crate) fn supervise(
    index: usize,
    name: String,
    mut handle: ProcessHandle,
    kill_rx: Option<oneshot::Receiver<()>>,
    board: StageBoard,
) -> JoinHandle<i32> {
    tokio::spawn(async move {
        let pid = handle.id();

        let status = match kill_rx {
            Some(mut kill_rx) => {
                tokio::select! {
                    status = handle.wait() => status,
                    Ok(()) = &mut kill_rx => {
                        info!(stage = index, cmd = %name, ?pid, "terminating first process of the chain");
                        if let Err(e) = handle.kill().await {
                            warn!(stage = index, cmd = %name, error = %e, "failed to kill process");
                        }
                        handle.wait().await
                    }
                }
            }
            None => handle.wait().await,
        };

        let code = match status {
            Ok(status) => exit_code(status),
            Err(e) => {
                warn!(stage = index, cmd = %name, error = %e, "failed to wait for process");
                -1
            }
        };

        debug!(stage = index, cmd = %name, ?pid, exit_code = code, "process exited");
        board.set(index, StageStatus::Exited { code });
        code
    })
}

/// Forward a stage's stderr to `sink` as it arrives, prefixing every line
/// with `[name] `.
///
/// Chunks are forwarded as soon as they are read, so a partial line shows up
/// before its newline does. The tag is only emitted at the start of a line.
pub(crate) fn forward_stderr(name: String, mut stderr: ChildStderr, sink: SharedSink) -> JoinHandle<()> {
    tokio::spawn(async move {
        let prefix = format!("[{name}] ");
        let mut buf = vec![0u8; 8 * 1024];
        let mut at_line_start = true;

        loop {
            let n = match stderr.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(cmd = %name, error = %e, "stderr read failed");
                    break;
                }
            };

            let tagged = tag_lines(prefix.as_bytes(), &buf[..n], &mut at_line_start);
            if let Err(e) = sink.write_all(&tagged).await {
                debug!(cmd = %name, error = %e, "error sink closed; dropping stderr");
                return;
            }
        }

        // Terminate a trailing partial line so the next writer starts clean.
        if !at_line_start {
            let _ = sink.write_all(b"\n").await;
        }
    })
}

/// Insert `prefix` before every line that starts inside `chunk`.
fn tag_lines(prefix: &[u8], chunk: &[u8], at_line_start: &mut bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(chunk.len() + prefix.len());
    for line in chunk.split_inclusive(|b| *b == b'\n') {
        if *at_line_start {
            out.extend_from_slice(prefix);
        }
        out.extend_from_slice(line);
        *at_line_start = line.ends_with(b"\n");
    }
    out
}

/// Copy the last stage's stdout into `sink` as it is produced.
pub(crate) fn forward_stdout(
    name: String,
    mut stdout: ChildStdout,
    sink: SharedSink,
    errors: SharedSink,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 8 * 1024];

        loop {
            let n = match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    report_io_error("stdout", &name, &e, &errors).await;
                    break;
                }
            };

            if let Err(e) = sink.write_all(&buf[..n]).await {
                report_io_error("stdout", &name, &e, &errors).await;
                break;
            }
        }
    })
}

/// Stream `input` into the first stage's stdin, closing it at EOF.
pub(crate) fn feed_stdin<R>(
    name: String,
    mut input: R,
    mut stdin: ChildStdin,
    errors: SharedSink,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = tokio::io::copy(&mut input, &mut stdin).await {
            report_io_error("stdin", &name, &e, &errors).await;
        }
        // Dropping `stdin` here delivers EOF to the child.
    })
}

async fn report_io_error(stream: &str, name: &str, err: &std::io::Error, errors: &SharedSink) {
    warn!(cmd = %name, stream, error = %err, "pipe error");
    let line = format!("{stream} error for `{name}` command. {err}");
    let _ = errors.write_line(&line).await;
}
