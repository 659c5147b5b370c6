#![cfg(unix)]

mod support;

use std::{sync::Arc, time::Duration};

use borgdash_config::{ConfigResolver, ConfigSources};
use borgdash_core::{
    RescanError, RescanSupervisor, ScanState, ScanStatus, StartOutcome,
};
use support::{eventually, resolver_with, shell_reporter};
use tempfile::TempDir;

const SETTLE: Duration = Duration::from_secs(10);
const LONG: Duration = Duration::from_secs(60);

fn supervisor(script: &str, timeout: Duration) -> (RescanSupervisor, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let config = resolver_with(dir.path(), shell_reporter(script, timeout));
    (RescanSupervisor::new(config), dir)
}

#[tokio::test]
async fn idle_before_first_start() {
    let (supervisor, _dir) = supervisor("true", LONG);

    assert!(!supervisor.is_running());
    assert_eq!(supervisor.get_status(), ScanStatus::idle());
    assert_eq!(
        serde_json::to_value(supervisor.get_status()).expect("serialize"),
        serde_json::json!({ "status": null, "stdout": null, "stderr": null })
    );
}

#[tokio::test]
async fn successful_run_captures_both_streams() {
    let (supervisor, _dir) = supervisor("echo hello; echo careful >&2", LONG);

    let outcome = supervisor.start().await.expect("start");
    assert_eq!(outcome, StartOutcome::Started);

    let status = supervisor.wait_for_terminal(SETTLE).await;
    assert_eq!(status.status, ScanState::Success);
    assert_eq!(status.stdout.as_deref(), Some("hello\n"));
    assert_eq!(status.stderr.as_deref(), Some("careful\n"));
    assert!(!supervisor.is_running());
}

#[tokio::test]
async fn nonzero_exit_is_an_error() {
    let (supervisor, _dir) = supervisor("echo broken >&2; exit 3", LONG);

    supervisor.start().await.expect("start");
    let status = supervisor.wait_for_terminal(SETTLE).await;

    assert_eq!(status.status, ScanState::Error);
    assert_eq!(status.stdout, None);
    assert_eq!(status.stderr.as_deref(), Some("broken\n"));
}

#[tokio::test]
async fn output_is_visible_while_running() {
    let (supervisor, _dir) = supervisor("echo early; exec sleep 30", LONG);

    supervisor.start().await.expect("start");
    let seen = eventually(SETTLE, || {
        supervisor.get_status().stdout.as_deref() == Some("early\n")
    })
    .await;
    assert!(seen, "partial stdout never appeared");
    assert_eq!(supervisor.get_status().status, ScanState::Running);
    assert!(supervisor.is_running());

    assert!(supervisor.stop());
    supervisor.wait_for_terminal(SETTLE).await;
}

#[tokio::test]
async fn second_start_while_running_is_refused() {
    let (supervisor, _dir) = supervisor("exec sleep 30", LONG);

    assert_eq!(supervisor.start().await.expect("start"), StartOutcome::Started);
    assert_eq!(
        supervisor.start().await.expect("start"),
        StartOutcome::AlreadyRunning
    );

    assert!(supervisor.stop());
    supervisor.wait_for_terminal(SETTLE).await;
}

#[tokio::test]
async fn concurrent_starts_launch_exactly_once() {
    let (supervisor, _dir) = supervisor("exec sleep 30", LONG);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { supervisor.start().await })
        })
        .collect();

    let mut started = 0;
    for handle in handles {
        let outcome = handle.await.expect("join").expect("start");
        if outcome == StartOutcome::Started {
            started += 1;
        }
    }
    assert_eq!(started, 1);

    assert!(supervisor.stop());
    supervisor.wait_for_terminal(SETTLE).await;
}

#[tokio::test]
async fn stop_reports_error_immediately_and_terminates() {
    let (supervisor, _dir) = supervisor("exec sleep 30", LONG);

    supervisor.start().await.expect("start");
    assert!(supervisor.is_running());

    assert!(supervisor.stop());
    assert!(!supervisor.is_running());
    assert_eq!(supervisor.get_status().status, ScanState::Error);

    let started = std::time::Instant::now();
    let status = supervisor.wait_for_terminal(SETTLE).await;
    assert_eq!(status.status, ScanState::Error);
    assert!(started.elapsed() < SETTLE, "process was not terminated");

    assert!(!supervisor.stop(), "second stop has nothing to signal");
}

#[tokio::test]
async fn restart_after_stop_waits_for_the_old_process() {
    let dir = TempDir::new().expect("tempdir");
    let pids = dir.path().join("pids");
    let script = format!(
        "trap '' TERM; echo $$ >> '{}'; sleep 2; sleep 2; sleep 2",
        pids.display()
    );
    let config = resolver_with(dir.path(), shell_reporter(&script, LONG));
    let supervisor = RescanSupervisor::new(config);

    supervisor.start().await.expect("first start");
    let recorded = eventually(SETTLE, || {
        std::fs::read_to_string(&pids).is_ok_and(|text| !text.is_empty())
    })
    .await;
    assert!(recorded, "first reporter never started");
    let first_pid: i32 = std::fs::read_to_string(&pids)
        .expect("pids")
        .lines()
        .next()
        .and_then(|line| line.trim().parse().ok())
        .expect("pid");

    assert!(supervisor.stop());
    assert_eq!(supervisor.get_status().status, ScanState::Error);

    let outcome = supervisor.start().await.expect("second start");
    assert_eq!(outcome, StartOutcome::Started);

    // The first reporter ignores SIGTERM; it must have been killed and
    // reaped before the second one was spawned.
    let alive = nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(first_pid),
        None,
    )
    .is_ok();
    assert!(!alive, "previous reporter still running");
}

#[tokio::test]
async fn wait_returns_running_when_the_timeout_elapses_first() {
    let (supervisor, _dir) = supervisor("exec sleep 30", LONG);

    supervisor.start().await.expect("start");
    let started = std::time::Instant::now();
    let status = supervisor
        .wait_for_terminal(Duration::from_millis(100))
        .await;

    assert_eq!(status.status, ScanState::Running);
    assert!(started.elapsed() < SETTLE);
    assert!(supervisor.is_running());

    assert!(supervisor.stop());
    supervisor.wait_for_terminal(SETTLE).await;
}

#[tokio::test]
async fn stop_without_a_run_changes_nothing() {
    let (supervisor, _dir) = supervisor("echo done", LONG);

    assert!(!supervisor.stop());
    assert_eq!(supervisor.get_status(), ScanStatus::idle());

    supervisor.start().await.expect("start");
    let finished = supervisor.wait_for_terminal(SETTLE).await;
    assert_eq!(finished.status, ScanState::Success);

    assert!(!supervisor.stop());
    assert_eq!(supervisor.get_status(), finished);
}

#[tokio::test]
async fn timeout_terminates_the_run() {
    let (supervisor, _dir) =
        supervisor("exec sleep 30", Duration::from_millis(200));

    supervisor.start().await.expect("start");
    let status = supervisor.wait_for_terminal(SETTLE).await;

    assert_eq!(status.status, ScanState::Error);
    let stderr = status.stderr.expect("timeout is reported on stderr");
    assert!(stderr.contains("timed out"), "stderr was {stderr:?}");
    assert!(!supervisor.is_running());
}

#[tokio::test]
async fn restart_discards_previous_output() {
    let dir = TempDir::new().expect("tempdir");
    let marker = dir.path().join("ran-once");
    let script = format!(
        "if [ -f '{m}' ]; then echo second; else touch '{m}'; echo first; fi",
        m = marker.display()
    );
    let config = resolver_with(dir.path(), shell_reporter(&script, LONG));
    let supervisor = RescanSupervisor::new(config);

    supervisor.start().await.expect("first start");
    let first = supervisor.wait_for_terminal(SETTLE).await;
    assert_eq!(first.stdout.as_deref(), Some("first\n"));

    supervisor.start().await.expect("second start");
    let second = supervisor.wait_for_terminal(SETTLE).await;
    assert_eq!(second.status, ScanState::Success);
    assert_eq!(second.stdout.as_deref(), Some("second\n"));
    assert_eq!(second.stderr, None);
}

#[tokio::test]
async fn missing_executable_is_an_error_with_reason() {
    let dir = TempDir::new().expect("tempdir");
    let mut settings = shell_reporter("true", LONG);
    settings.dashboard.reporter_path =
        "/nonexistent/borgdash-reporter".to_string();
    settings.dashboard.reporter_args.clear();
    let supervisor = RescanSupervisor::new(resolver_with(dir.path(), settings));

    assert_eq!(supervisor.start().await.expect("start"), StartOutcome::Started);

    let status = supervisor.get_status();
    assert_eq!(status.status, ScanState::Error);
    assert!(!supervisor.is_running());
    let stderr = status.stderr.expect("launch failure is reported");
    assert!(
        stderr.contains("/nonexistent/borgdash-reporter"),
        "stderr was {stderr:?}"
    );
}

#[tokio::test]
async fn never_running_after_exit() {
    let (supervisor, _dir) = supervisor("exit 0", LONG);

    supervisor.start().await.expect("start");
    let exited = eventually(SETTLE, || !supervisor.is_running()).await;
    assert!(exited);

    // Once the run is no longer running the status must be terminal too.
    assert!(supervisor.get_status().status.is_terminal());
}

#[tokio::test]
async fn unavailable_configuration_fails_start() {
    let dir = TempDir::new().expect("tempdir");
    let sources = ConfigSources::new(
        dir.path().join("config.yaml"),
        dir.path().join("config_default.yaml"),
    )
    .without_builtin();
    let supervisor =
        RescanSupervisor::new(Arc::new(ConfigResolver::new(sources)));

    let err = supervisor.start().await.expect_err("no configuration");
    assert!(matches!(err, RescanError::Config(_)));
    assert_eq!(supervisor.get_status(), ScanStatus::idle());
}
