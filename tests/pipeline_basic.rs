// tests/pipeline_basic.rs
mod common;
use crate::common::builders::CommandListBuilder;
use crate::common::{init_tracing, with_timeout, CapturedSinks};

use std::collections::BTreeSet;
use std::error::Error;

use spawnpipe::config::ExecutionOptions;
use spawnpipe::exec::{Pipeline, StageStatus};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn single_command_writes_to_output_sink() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new().cmd("echo", &["hi"]).build();

    let handle = Pipeline::new(commands).sinks(out.sinks()).spawn()?;
    let code = with_timeout(handle.wait()).await;

    assert_eq!(code, 0);
    assert_eq!(out.stdout.text(), "hi\n");
    assert_eq!(out.stderr.text(), "");
    Ok(())
}

#[tokio::test]
async fn output_of_each_stage_feeds_the_next() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("printf", &["a\nb\nc\n"])
        .cmd("grep", &["b"])
        .build();

    let handle = Pipeline::new(commands).sinks(out.sinks()).spawn()?;
    let board = handle.board();
    let code = with_timeout(handle.wait()).await;

    assert_eq!(code, 0);
    assert_eq!(out.stdout.text(), "b\n");
    assert_eq!(board.get(1), Some(StageStatus::Exited { code: 0 }));
    Ok(())
}

#[tokio::test]
async fn three_stage_chain_preserves_order() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("printf", &["3\n1\n2\n"])
        .cmd("sort", &["-n"])
        .cmd("tr", &["\n", ","])
        .build();

    let code = with_timeout(Pipeline::new(commands).sinks(out.sinks()).spawn()?.wait()).await;

    assert_eq!(code, 0);
    assert_eq!(out.stdout.text(), "1,2,3,");
    Ok(())
}

#[tokio::test]
async fn unbounded_producer_is_piped_and_stopped() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("yes", &[])
        .cmd("head", &["-n", "3"])
        .build();

    let code = with_timeout(Pipeline::new(commands).sinks(out.sinks()).spawn()?.wait()).await;

    assert_eq!(code, 0);
    assert_eq!(out.stdout.text(), "y\ny\ny\n");
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_code_is_passed_verbatim() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("echo", &["ignored"])
        .cmd("sh", &["-c", "cat >/dev/null; exit 3"])
        .build();

    let code = with_timeout(Pipeline::new(commands).sinks(out.sinks()).spawn()?.wait()).await;
    assert_eq!(code, 3);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn signal_death_maps_to_128_plus_signal() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("sh", &["-c", "kill -9 $$"])
        .build();

    let code = with_timeout(Pipeline::new(commands).sinks(out.sinks()).spawn()?.wait()).await;
    assert_eq!(code, 128 + 9);
    Ok(())
}

#[tokio::test]
async fn stderr_of_every_stage_is_forwarded_and_tagged() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("sh", &["-c", "echo first >&2; echo data"])
        .cmd("sh", &["-c", "cat; echo second >&2"])
        .build();

    let code = with_timeout(Pipeline::new(commands).sinks(out.sinks()).spawn()?.wait()).await;
    assert_eq!(code, 0);
    assert_eq!(out.stdout.text(), "data\n");

    // The last stage's stderr is drained before completion; the first
    // stage's forwarder may lag slightly behind.
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while !out.stderr.text().contains("[sh] first") && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let errors = out.stderr.text();
    assert!(errors.contains("[sh] first\n"), "stderr was: {errors:?}");
    assert!(errors.contains("[sh] second\n"), "stderr was: {errors:?}");
    Ok(())
}

#[tokio::test]
async fn working_directory_option_is_applied() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let expected = std::fs::canonicalize(dir.path())?;

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("pwd", &["-P"])
        .cmd("cat", &[])
        .build();
    let options = ExecutionOptions::default().with_working_dir(dir.path());

    let code = with_timeout(
        Pipeline::new(commands)
            .options(options)
            .sinks(out.sinks())
            .spawn()?
            .wait(),
    )
    .await;

    assert_eq!(code, 0);
    assert_eq!(out.stdout.text(), format!("{}\n", expected.display()));
    Ok(())
}

#[tokio::test]
async fn environment_option_replaces_inherited_variables() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new().cmd("env", &[]).build();
    let options = ExecutionOptions::default()
        .with_env([("FOO", "bar"), ("PATH", "/usr/bin:/bin")]);

    let code = with_timeout(
        Pipeline::new(commands)
            .options(options)
            .sinks(out.sinks())
            .spawn()?
            .wait(),
    )
    .await;

    assert_eq!(code, 0);
    let lines: BTreeSet<String> = out.stdout.text().lines().map(str::to_string).collect();
    let expected: BTreeSet<String> = ["FOO=bar", "PATH=/usr/bin:/bin"]
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(lines, expected);
    Ok(())
}

#[tokio::test]
async fn input_is_streamed_into_the_first_stage() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("cat", &[])
        .cmd("tr", &["a-z", "A-Z"])
        .build();

    let code = with_timeout(
        Pipeline::new(commands)
            .sinks(out.sinks())
            .input(&b"hello\nworld\n"[..])
            .spawn()?
            .wait(),
    )
    .await;

    assert_eq!(code, 0);
    assert_eq!(out.stdout.text(), "HELLO\nWORLD\n");
    Ok(())
}

#[tokio::test]
async fn first_stage_reads_nothing_without_input() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("cat", &[])
        .cmd("wc", &["-c"])
        .build();

    let code = with_timeout(Pipeline::new(commands).sinks(out.sinks()).spawn()?.wait()).await;

    assert_eq!(code, 0);
    assert_eq!(out.stdout.text().trim(), "0");
    Ok(())
}

#[tokio::test]
async fn partial_stderr_line_is_forwarded_while_stage_runs() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("sh", &["-c", "printf 'no newline yet' >&2; sleep 3"])
        .build();

    let handle = Pipeline::new(commands).sinks(out.sinks()).spawn()?;
    let board = handle.board();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
    while out.stderr.text().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(out.stderr.text(), "[sh] no newline yet");
    assert!(
        matches!(board.get(0), Some(StageStatus::Running { .. })),
        "stderr must arrive before the stage exits"
    );

    let code = with_timeout(handle.wait()).await;
    assert_eq!(code, 0);
    assert_eq!(out.stderr.text(), "[sh] no newline yet\n");
    Ok(())
}

#[tokio::test]
async fn stderr_lines_split_across_reads_are_tagged_once() -> TestResult {
    init_tracing();

    let out = CapturedSinks::new();
    let commands = CommandListBuilder::new()
        .cmd("sh", &["-c", "printf 'one' >&2; sleep 0.2; printf ' two\\nthree\\n' >&2"])
        .build();

    let code = with_timeout(Pipeline::new(commands).sinks(out.sinks()).spawn()?.wait()).await;

    assert_eq!(code, 0);
    assert_eq!(out.stderr.text(), "[sh] one two\n[sh] three\n");
    Ok(())
}
