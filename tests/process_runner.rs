//! Integration tests for bounded process execution against real programs.
#![cfg(unix)]

use std::time::{Duration, Instant};

use portico::process::{CommandSpec, ProcessError, ProcessRunner};
use rstest::{fixture, rstest};
use tokio_util::sync::CancellationToken;

#[fixture]
fn runner() -> ProcessRunner {
    ProcessRunner::default()
}

fn shell(script: &str, timeout: Duration) -> CommandSpec {
    CommandSpec::new("sh", timeout).with_args(["-c", script])
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_run_returns_trimmed_stdout(runner: ProcessRunner) {
    let output = runner
        .run(
            &shell("echo '  Connector ID: abc  '", Duration::from_secs(5)),
            &CancellationToken::new(),
        )
        .await
        .expect("echo should succeed");

    assert_eq!(output.stdout(), "Connector ID: abc");
    assert!(!output.truncated());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn child_that_never_exits_times_out(runner: ProcessRunner) {
    let timeout = Duration::from_millis(200);
    let started = Instant::now();

    let result = runner
        .run(&shell("echo partial; sleep 30", timeout), &CancellationToken::new())
        .await;

    let elapsed = started.elapsed();
    let Err(ProcessError::Timeout { output, .. }) = result else {
        panic!("expected timeout, got {result:?}");
    };
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(3), "took {elapsed:?}");
    assert_eq!(output.stdout().trim(), "partial");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn nonzero_exit_carries_exit_code_and_stderr(runner: ProcessRunner) {
    let result = runner
        .run(
            &shell("echo 'bad config' >&2; exit 3", Duration::from_secs(5)),
            &CancellationToken::new(),
        )
        .await;

    let Err(err) = result else {
        panic!("expected failure, got {result:?}");
    };
    assert_eq!(err.exit_code(), Some(3));
    assert_eq!(
        err.output().map(|output| output.stderr().trim()),
        Some("bad config")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancellation_kills_the_child(runner: ProcessRunner) {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let started = Instant::now();

    let result = runner
        .run(&shell("sleep 30", Duration::from_secs(30)), &cancel)
        .await;

    assert!(matches!(result, Err(ProcessError::Cancelled { .. })));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_program_is_a_launch_error(runner: ProcessRunner) {
    let spec = CommandSpec::new("portico-no-such-program", Duration::from_secs(1));

    let result = runner.run(&spec, &CancellationToken::new()).await;

    assert!(matches!(result, Err(ProcessError::Launch { ref program, .. }) if program == "portico-no-such-program"));
}

#[tokio::test(flavor = "multi_thread")]
async fn output_beyond_cap_is_truncated() {
    let runner = ProcessRunner::new(1024);

    let output = runner
        .run(
            &shell("yes portico | head -c 65536", Duration::from_secs(5)),
            &CancellationToken::new(),
        )
        .await
        .expect("yes should succeed");

    assert!(output.truncated());
    assert!(output.stdout().len() <= 1024);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn environment_and_working_directory_reach_the_child(runner: ProcessRunner) {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let dir_path = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temp path should be UTF-8");
    let spec = shell("printf '%s:%s' \"$PORTICO_PROBE\" \"$(basename \"$PWD\")\"", Duration::from_secs(5))
        .with_env([("PORTICO_PROBE".to_owned(), "set".to_owned())])
        .with_working_dir(dir_path.clone());

    let output = runner
        .run(&spec, &CancellationToken::new())
        .await
        .expect("printf should succeed");

    let expected = format!("set:{}", dir_path.file_name().unwrap_or_default());
    assert_eq!(output.stdout(), expected);
}
