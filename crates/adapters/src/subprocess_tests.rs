// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[tokio::test]
async fn run_with_timeout_captures_output() {
    let output = run_with_timeout(sh("echo hello"), Duration::from_secs(5), "echo").await.unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn run_with_timeout_kills_slow_command() {
    let err = run_with_timeout(sh("sleep 5"), Duration::from_millis(50), "sleep").await.unwrap_err();
    assert!(matches!(err, SubprocessError::TimedOut { .. }));
    assert!(err.to_string().contains("sleep timed out"));
}

#[tokio::test]
async fn spawn_failure_is_reported() {
    let cmd = Command::new("/nonexistent/definitely-not-a-binary");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "missing").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Spawn { .. }));
}

#[tokio::test]
async fn run_streamed_returns_exit_code_as_value() {
    let code = run_streamed(sh("echo out; echo err >&2; exit 2"), Duration::from_secs(5), "t", Echo::Debug)
        .await
        .unwrap();
    assert_eq!(code, 2);
}

#[tokio::test]
async fn run_streamed_times_out() {
    let err = run_streamed(sh("sleep 5"), Duration::from_millis(50), "slow", Echo::Info)
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::TimedOut { .. }));
}

#[yare::parameterized(
    plain       = { "abc-1.2/x",    "abc-1.2/x" },
    empty       = { "",             "''" },
    space       = { "a b",          "'a b'" },
    quote       = { "it's",         r"'it'\''s'" },
    glob        = { "cl_*",         "'cl_*'" },
    dollar      = { "$HOME",        "'$HOME'" },
)]
fn shell_quote_cases(input: &str, expected: &str) {
    assert_eq!(shell_quote(input), expected);
}
