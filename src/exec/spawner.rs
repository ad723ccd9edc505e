// src/exec/spawner.rs

//! Process-spawn primitive used by the pipeline.
//!
//! The pipeline talks to a `ProcessSpawner` instead of calling
//! `tokio::process::Command` directly, so tests can observe or refuse spawns
//! while the production path stays in [`TokioSpawner`].

use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::config::{CommandSpec, ExecutionOptions};

/// Everything needed to start one stage of a pipeline.
#[derive(Debug)]
pub struct SpawnRequest<'a> {
    pub command: &'a CommandSpec,
    pub options: &'a ExecutionOptions,
    /// Where the stage reads from: null, a fresh pipe, or the previous
    /// stage's stdout.
    pub stdin: Stdio,
}

/// Trait abstracting how a single command is started.
pub trait ProcessSpawner: Send + Sync {
    /// Start the process described by `request`. Stdout and stderr of the
    /// returned handle must be piped.
    fn spawn(&self, request: SpawnRequest<'_>) -> io::Result<ProcessHandle>;
}

/// Production spawner backed by `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, request: SpawnRequest<'_>) -> io::Result<ProcessHandle> {
        let SpawnRequest {
            command,
            options,
            stdin,
        } = request;

        let mut cmd = Command::new(&command.executable);
        cmd.args(&command.arguments)
            .current_dir(&options.working_dir)
            .env_clear()
            .envs(&options.env)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;
        debug!(cmd = %command.executable, pid = ?child.id(), "process spawned");
        Ok(ProcessHandle::new(child))
    }
}

/// A running child process with its three standard streams.
///
/// Streams are `take`n by the pipeline as it wires them up; the handle
/// itself ends up owned by the stage supervisor.
#[derive(Debug)]
pub struct ProcessHandle {
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
    child: Child,
}

impl ProcessHandle {
    pub fn new(mut child: Child) -> Self {
        Self {
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
            child,
        }
    }

    /// OS process id; `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Forcibly terminate and reap the process.
    pub async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}

/// Exit code of a spawn failure, following the shell conventions for
/// "command not found" and "not executable".
pub fn spawn_failure_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::NotFound => 127,
        io::ErrorKind::PermissionDenied => 126,
        _ => -1,
    }
}

/// Integer exit code for a finished process. Signal deaths map to
/// `128 + signal` on Unix.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
