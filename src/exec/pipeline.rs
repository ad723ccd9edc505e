// src/exec/pipeline.rs

//! The pipeline executor: `cmd1 | cmd2 | ... | cmdN`.
//!
//! [`Pipeline::spawn`] starts every stage in order, hands each stage's stdout
//! file descriptor straight to the next stage's stdin (no buffering in this
//! process, so OS pipe backpressure applies end to end) and returns a
//! [`PipelineHandle`] without waiting for anything.
//!
//! Failure handling mirrors a shell with one addition: whenever a stage fails
//! to start, and again when the last stage terminates, the *first* stage is
//! killed. An unbounded producer such as `yes` therefore never outlives its
//! pipeline.

use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::process::ChildStdout;
use tokio::task::JoinHandle;
use toml::Value;
use tracing::{debug, error, info, warn};

use crate::config::{resolve_options, CommandList, ExecutionOptions};
use crate::errors::{Result, SpawnPipeError};
use crate::exec::sink::{SharedSink, Sinks};
use crate::exec::spawner::{spawn_failure_code, ProcessSpawner, SpawnRequest, TokioSpawner};
use crate::exec::stage::{
    feed_stdin, forward_stderr, forward_stdout, supervise, KillSwitch, StageBoard, StageStatus,
};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Builder for one pipeline invocation.
pub struct Pipeline {
    commands: CommandList,
    options: ExecutionOptions,
    sinks: Sinks,
    input: Option<BoxedReader>,
    spawner: Arc<dyn ProcessSpawner>,
}

impl Pipeline {
    /// Pipeline with default options (this process's cwd and environment),
    /// default sinks (this process's stdout/stderr) and no input.
    pub fn new(commands: CommandList) -> Self {
        Self {
            commands,
            options: ExecutionOptions::default(),
            sinks: Sinks::default(),
            input: None,
            spawner: Arc::new(TokioSpawner),
        }
    }

    pub fn options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sinks(mut self, sinks: Sinks) -> Self {
        self.sinks = sinks;
        self
    }

    /// Stream `input` into the first stage's stdin. Without it the first
    /// stage reads from a null device.
    pub fn input<R>(mut self, input: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.input = Some(Box::new(input));
        self
    }

    pub fn spawner<S>(mut self, spawner: S) -> Self
    where
        S: ProcessSpawner + 'static,
    {
        self.spawner = Arc::new(spawner);
        self
    }

    /// Spawn and wire every stage, then return immediately.
    ///
    /// Must be called from within a Tokio runtime. Per-stage failures are not
    /// returned here; they are reported on the error sink and the pipeline
    /// still completes with an exit code.
    pub fn spawn(self) -> Result<PipelineHandle> {
        tokio::runtime::Handle::try_current().map_err(|e| {
            SpawnPipeError::Other(anyhow::anyhow!(
                "pipelines must be spawned from within a Tokio runtime: {e}"
            ))
        })?;

        let Pipeline {
            commands,
            options,
            sinks,
            mut input,
            spawner,
        } = self;

        let len = commands.len();
        let board = StageBoard::new(len);
        let (kill_switch, kill_rx) = KillSwitch::new();
        let mut kill_rx = Some(kill_rx);

        info!(pipeline = %commands, cwd = ?options.working_dir, "starting pipeline");

        // Things the completion observer waits on before reporting.
        let mut pending_reports: Vec<JoinHandle<()>> = Vec::new();
        let mut last = LastStage::FailedToStart { code: -1 };
        let mut upstream: Option<(String, ChildStdout)> = None;

        for (index, command) in commands.iter().enumerate() {
            let name = command.executable.clone();
            let is_first = index == 0;
            let is_last = index + 1 == len;

            let stdin = if is_first {
                if input.is_some() { Stdio::piped() } else { Stdio::null() }
            } else {
                match upstream.take() {
                    Some((prev_name, stdout)) => match TryInto::<Stdio>::try_into(stdout) {
                        Ok(stdio) => stdio,
                        Err(e) => {
                            warn!(stage = index, cmd = %prev_name, error = %e, "could not hand over stdout");
                            pending_reports.push(report(
                                &sinks.stderr,
                                format!("stdout error for `{prev_name}` command. {e}"),
                            ));
                            Stdio::null()
                        }
                    },
                    // Upstream failed to start: this stage sees an empty input.
                    None => Stdio::null(),
                }
            };

            let request = SpawnRequest {
                command,
                options: &options,
                stdin,
            };

            let mut handle = match spawner.spawn(request) {
                Ok(handle) => handle,
                Err(e) => {
                    error!(stage = index, cmd = %name, error = %e, "failed to start process");
                    board.set(index, StageStatus::FailedToStart { error: e.to_string() });
                    pending_reports.push(report(
                        &sinks.stderr,
                        format!("Failed to execute `{name}` command. {e}"),
                    ));
                    kill_switch.trigger();
                    if is_last {
                        last = LastStage::FailedToStart {
                            code: spawn_failure_code(&e),
                        };
                    }
                    continue;
                }
            };

            board.set(index, StageStatus::Running { pid: handle.id() });

            if is_first {
                if let (Some(reader), Some(stdin)) = (input.take(), handle.stdin.take()) {
                    feed_stdin(name.clone(), reader, stdin, sinks.stderr.clone());
                }
            }

            let stderr_task = handle
                .stderr
                .take()
                .map(|stderr| forward_stderr(name.clone(), stderr, sinks.stderr.clone()));

            let stdout = handle.stdout.take();
            let kill = if is_first { kill_rx.take() } else { None };

            if is_last {
                let stdout_task = stdout.map(|stdout| {
                    forward_stdout(
                        name.clone(),
                        stdout,
                        sinks.stdout.clone(),
                        sinks.stderr.clone(),
                    )
                });
                let exit = supervise(index, name, handle, kill, board.clone());
                last = LastStage::Running {
                    exit,
                    stdout_task,
                    stderr_task,
                };
            } else {
                upstream = stdout.map(|stdout| (name.clone(), stdout));
                supervise(index, name, handle, kill, board.clone());
            }
        }

        let completion = tokio::spawn(complete(
            last,
            pending_reports,
            kill_switch.clone(),
            commands.last().executable.clone(),
        ));

        Ok(PipelineHandle {
            completion,
            board,
            kill_switch,
        })
    }
}

/// What the completion observer waits on.
enum LastStage {
    FailedToStart {
        code: i32,
    },
    Running {
        exit: JoinHandle<i32>,
        stdout_task: Option<JoinHandle<()>>,
        stderr_task: Option<JoinHandle<()>>,
    },
}

async fn complete(
    last: LastStage,
    pending_reports: Vec<JoinHandle<()>>,
    kill_switch: KillSwitch,
    name: String,
) -> i32 {
    for task in pending_reports {
        let _ = task.await;
    }

    let code = match last {
        LastStage::FailedToStart { code } => code,
        LastStage::Running {
            exit,
            stdout_task,
            stderr_task,
        } => {
            // Drain output first so everything is delivered before completion.
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }
            match exit.await {
                Ok(code) => code,
                Err(e) => {
                    error!(cmd = %name, error = %e, "stage supervisor failed");
                    -1
                }
            }
        }
    };

    if kill_switch.trigger() {
        debug!("first process still running at completion; terminated it");
    }

    info!(cmd = %name, exit_code = code, "pipeline finished");
    code
}

fn report(sink: &SharedSink, line: String) -> JoinHandle<()> {
    let sink = sink.clone();
    tokio::spawn(async move {
        let _ = sink.write_line(&line).await;
    })
}

/// Handle to a spawned pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    completion: JoinHandle<i32>,
    board: StageBoard,
    kill_switch: KillSwitch,
}

impl PipelineHandle {
    /// Wait for the last stage to terminate and return its exit code.
    pub async fn wait(self) -> i32 {
        match self.completion.await {
            Ok(code) => code,
            Err(e) => {
                error!(error = %e, "pipeline completion task failed");
                -1
            }
        }
    }

    /// Current status of every stage, in pipeline order.
    pub fn stages(&self) -> Vec<StageStatus> {
        self.board.snapshot()
    }

    /// Shared status board; stays valid after [`PipelineHandle::wait`].
    pub fn board(&self) -> StageBoard {
        self.board.clone()
    }

    /// Kill the first stage. Idempotent: later calls, and calls after the
    /// first stage exited, are no-ops.
    pub fn kill_first(&self) -> bool {
        self.kill_switch.trigger()
    }
}

/// Validate `commands`, spawn the pipeline with default sinks and call
/// `on_complete` exactly once with the last command's exit code.
///
/// Malformed `commands` are reported synchronously and nothing is spawned.
/// `options` is resolved leniently: anything that is not a table means
/// "use the defaults".
pub fn spawn_and_pipe<F>(commands: &Value, options: Option<&Value>, on_complete: F) -> Result<()>
where
    F: FnOnce(i32) + Send + 'static,
{
    let commands = CommandList::try_from(commands)?;
    let options = resolve_options(options);

    let handle = Pipeline::new(commands).options(options).spawn()?;
    tokio::spawn(async move {
        on_complete(handle.wait().await);
    });

    Ok(())
}
