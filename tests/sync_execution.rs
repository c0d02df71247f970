#![cfg(unix)]

use std::collections::HashMap;
use std::error::Error;
use std::time::{Duration, Instant};

use execkit::errors::ExecError;
use execkit::exec::{
    CommandSpec, Environment, ExecRequest, Execution, Executor, ShutdownRegistry, SuccessCodes,
};
use execkit::types::StdinMode;
use execkit_test_utils::{init_tracing, sh, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn executor() -> Executor {
    Executor::new(ShutdownRegistry::new())
}

fn request(script: &str) -> ExecRequest {
    ExecRequest::new(sh(script)).stdin(StdinMode::Null)
}

#[tokio::test]
async fn exit_zero_without_success_codes_succeeds() -> TestResult {
    init_tracing();

    let execution = with_timeout(executor().execute(&request("exit 0"))).await?;
    assert_eq!(execution.exit_code(), Some(0));
    Ok(())
}

#[tokio::test]
async fn exit_three_is_accepted_when_listed() -> TestResult {
    init_tracing();

    let req = request("exit 3").success_codes(SuccessCodes::new([0, 3]));
    let execution = with_timeout(executor().execute(&req)).await?;
    assert!(matches!(execution, Execution::Completed { exit_code: 3 }));
    Ok(())
}

#[tokio::test]
async fn exit_three_fails_against_zero_only() {
    init_tracing();

    let req = request("exit 3").success_codes(SuccessCodes::new([0]));
    let result = with_timeout(executor().execute(&req)).await;

    match result {
        Err(ExecError::NonZeroExit { code, command }) => {
            assert_eq!(code, 3);
            assert!(command.contains("exit 3"), "command was {command}");
        }
        Err(e) => panic!("Expected NonZeroExit, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[tokio::test]
async fn empty_success_set_rejects_nonzero() {
    init_tracing();

    let result = with_timeout(executor().execute(&request("exit 1"))).await;
    assert_eq!(result.err().and_then(|e| e.exit_code()), Some(1));
}

#[tokio::test]
async fn output_is_in_file_before_call_returns() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("logs/nested/run.log");

    let req = request(r#"i=1; while [ $i -le 2000 ]; do echo "line $i"; i=$((i+1)); done; echo oops >&2"#)
        .output_file(&out);
    with_timeout(executor().execute(&req)).await?;

    let contents = std::fs::read_to_string(&out)?;
    assert_eq!(contents.lines().count(), 2001);
    assert!(contents.contains("line 1\n"));
    assert!(contents.contains("line 2000\n"));
    assert!(contents.contains("oops\n"));
    Ok(())
}

#[tokio::test]
async fn output_file_receives_bytes_verbatim() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("missing-parent/out.txt");

    let req = request(r"printf 'alpha\nbeta\n\tgamma'").output_file(&out);
    with_timeout(executor().execute(&req)).await?;

    assert_eq!(std::fs::read(&out)?, b"alpha\nbeta\n\tgamma");
    Ok(())
}

#[tokio::test]
async fn output_is_kept_even_when_the_command_fails() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("fail.log");

    let req = request("echo before-failure; exit 9").output_file(&out);
    let result = with_timeout(executor().execute(&req)).await;

    assert_eq!(result.err().and_then(|e| e.exit_code()), Some(9));
    assert_eq!(std::fs::read_to_string(&out)?, "before-failure\n");
    Ok(())
}

#[tokio::test]
async fn uncreatable_parent_ends_in_launch_failure() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "a file, not a directory")?;

    // Directory creation only warns; the file open is what fails.
    let req = request("echo never").output_file(blocker.join("out.log"));
    let result = with_timeout(executor().execute(&req)).await;

    assert!(matches!(result, Err(ExecError::LaunchFailure { .. })));
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_launch_failure() -> TestResult {
    init_tracing();

    let req = ExecRequest::new(CommandSpec::new(["execkit-no-such-program-xyz"])?);
    match with_timeout(executor().execute(&req)).await {
        Err(ExecError::LaunchFailure { command, source }) => {
            assert!(command.contains("execkit-no-such-program-xyz"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("Expected LaunchFailure, got: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn missing_working_dir_is_a_launch_failure() {
    init_tracing();

    let req = request("true").working_dir("/definitely/not/a/real/dir");
    let result = with_timeout(executor().execute(&req)).await;
    assert!(matches!(result, Err(ExecError::LaunchFailure { .. })));
}

#[tokio::test]
async fn runs_in_the_given_working_dir() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("pwd.txt");

    let req = request("pwd -P").working_dir(dir.path()).output_file(&out);
    with_timeout(executor().execute(&req)).await?;

    let printed = std::fs::read_to_string(&out)?;
    assert_eq!(
        std::path::Path::new(printed.trim()),
        std::fs::canonicalize(dir.path())?
    );
    Ok(())
}

#[tokio::test]
async fn exact_environment_replaces_inherited_one() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("env.txt");

    let vars: HashMap<String, String> = [("ONLY".to_string(), "x".to_string())].into();
    let req = ExecRequest::new(CommandSpec::new([
        "/bin/sh",
        "-c",
        r#"printf '%s|%s' "$ONLY" "${EXECKIT_TEST_MARKER:-unset}""#,
    ])?)
    .stdin(StdinMode::Null)
    .env(Environment::Exact(vars))
    .output_file(&out);

    with_timeout(executor().execute(&req)).await?;
    assert_eq!(std::fs::read_to_string(&out)?, "x|unset");
    Ok(())
}

#[tokio::test]
async fn overlay_environment_adds_to_inherited_one() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("env.txt");

    let req = request(r#"printf '%s|%s' "$EXECKIT_OVERLAY" "${PATH:+has-path}""#)
        .env(Environment::inherited_with([("EXECKIT_OVERLAY", "on")]))
        .output_file(&out);

    with_timeout(executor().execute(&req)).await?;
    assert_eq!(std::fs::read_to_string(&out)?, "on|has-path");
    Ok(())
}

#[tokio::test]
async fn sync_requests_never_touch_the_registry() -> TestResult {
    init_tracing();
    let registry = ShutdownRegistry::new();
    let exec = Executor::new(registry.clone());

    with_timeout(exec.execute(&request("sleep 0.1"))).await?;
    assert!(registry.is_empty());
    Ok(())
}

#[tokio::test]
async fn held_open_pipes_do_not_mask_the_exit_code() {
    init_tracing();

    let drain = Duration::from_millis(200);
    let exec = Executor::new(ShutdownRegistry::new()).with_drain_timeout(drain);
    let req = request("sleep 3 & exit 3").success_codes(SuccessCodes::new([0]));

    let started = Instant::now();
    let result = with_timeout(exec.execute(&req)).await;
    let elapsed = started.elapsed();

    assert!(
        matches!(result, Err(ExecError::NonZeroExit { code: 3, .. })),
        "got {result:?}"
    );
    assert!(elapsed >= drain, "took {elapsed:?}");
    assert!(elapsed < drain * 2, "pumps waited past one drain timeout: {elapsed:?}");
}
