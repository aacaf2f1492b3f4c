// tests/controller_shutdown.rs
#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use shrinkwrap::config::Config;
use shrinkwrap::engine::{Controller, Phase, ShutdownSignal, SignalListener, StopReason, Supervisor};
use shrinkwrap::errors::ShrinkwrapError;
use shrinkwrap::fs::RealFileSystem;
use shrinkwrap::notify::NotifyState;
use shrinkwrap_test_utils::builders::ConfigBuilder;
use shrinkwrap_test_utils::capture::{SharedBuffer, capture_console};
use shrinkwrap_test_utils::fake_notifier::RecordingNotifier;
use shrinkwrap_test_utils::fixtures::ShellFixture;
use shrinkwrap_test_utils::{init_tracing, with_timeout};

const LONG_RUNNING: &str = "echo \"$1 READY\"\nsleep 30\n";

fn build(config: Config) -> (Controller, RecordingNotifier, SharedBuffer) {
    init_tracing();
    let (console, output) = capture_console();
    let notifier = RecordingNotifier::new();
    let supervisor = Supervisor::new(console, Arc::new(notifier.clone()), config.service_name());
    (Controller::new(supervisor, config), notifier, output)
}

#[test]
fn start_then_shutdown_joins_every_worker() {
    let fixture = ShellFixture::new("svc");
    let script = fixture.script("serve.sh", LONG_RUNNING);
    let config = ConfigBuilder::new("svc", fixture.basedir())
        .command(&["@binary", &script, "@name"])
        .extra_command(&["@binary", &script, "second"])
        .extra_var("@name", "first")
        .build();
    let (mut controller, notifier, output) = build(config);

    let report = controller.start(&RealFileSystem).unwrap();
    assert_eq!(report.started.len(), 2);
    assert_eq!(report.spawn_failures, 0);
    assert_eq!(report.binary.name(), "svc");
    assert_eq!(controller.phase(), Phase::Running);

    assert!(output.wait_for_line("first READY", Duration::from_secs(5)));
    assert!(output.wait_for_line("second READY", Duration::from_secs(5)));
    assert!(notifier.wait_for_count(NotifyState::Ready, 2, Duration::from_secs(5)));

    let shutdown = controller.shutdown(StopReason::Signal(ShutdownSignal::Terminate));

    assert!(shutdown.is_success());
    assert!(shutdown.notified);
    assert_eq!(shutdown.exits.len(), 2);
    assert!(shutdown.exits.iter().all(|e| e.killed && e.ready));
    assert_eq!(controller.supervisor().worker_count(), 0);
    assert_eq!(controller.phase(), Phase::Stopped);
    assert_eq!(notifier.sent().last(), Some(&NotifyState::Stopping));
}

#[test]
fn second_shutdown_is_a_no_op() {
    let fixture = ShellFixture::new("svc");
    let script = fixture.script("serve.sh", LONG_RUNNING);
    let config = ConfigBuilder::new("svc", fixture.basedir())
        .command(&["@binary", &script, "only"])
        .build();
    let (mut controller, notifier, _output) = build(config);

    controller.start(&RealFileSystem).unwrap();
    let first = controller.shutdown(StopReason::Signal(ShutdownSignal::Interrupt));
    let second = controller.shutdown(StopReason::Signal(ShutdownSignal::Terminate));

    assert_eq!(first.exits.len(), 1);
    assert!(second.exits.is_empty());
    assert!(!second.notified);
    assert_eq!(notifier.count(NotifyState::Stopping), 1);
}

#[test]
fn unresolvable_binary_fails_start_without_notifications() {
    let fixture = ShellFixture::new("svc");
    let config = ConfigBuilder::new("httpd", fixture.basedir()).build();
    let (mut controller, notifier, _output) = build(config);

    let err = controller.start(&RealFileSystem).unwrap_err();
    assert!(matches!(err, ShrinkwrapError::BinaryNotFound { .. }));

    let shutdown = controller.shutdown(StopReason::StartupFailed);
    assert!(!shutdown.is_success());
    assert!(!shutdown.notified);
    assert!(notifier.sent().is_empty());
}

#[test]
fn single_spawn_failure_is_returned_as_is() {
    let fixture = ShellFixture::new("svc");
    let config = ConfigBuilder::new("svc", fixture.basedir())
        .command(&["/nonexistent/shrinkwrap-missing"])
        .build();
    let (mut controller, _notifier, _output) = build(config);

    let err = controller.start(&RealFileSystem).unwrap_err();
    assert!(matches!(err, ShrinkwrapError::SpawnError { .. }));
    assert_eq!(controller.phase(), Phase::Starting);
}

#[test]
fn several_spawn_failures_are_summarised() {
    let fixture = ShellFixture::new("svc");
    let config = ConfigBuilder::new("svc", fixture.basedir())
        .command(&["/nonexistent/a"])
        .extra_command(&["/nonexistent/b"])
        .build();
    let (mut controller, _notifier, _output) = build(config);

    let err = controller.start(&RealFileSystem).unwrap_err();
    assert!(matches!(err, ShrinkwrapError::NoWorkersStarted { failures: 2 }));
}

#[test]
fn partial_spawn_failure_keeps_the_rest_running() {
    let fixture = ShellFixture::new("svc");
    let script = fixture.script("serve.sh", LONG_RUNNING);
    let config = ConfigBuilder::new("svc", fixture.basedir())
        .command(&["@binary", &script, "ok"])
        .extra_command(&["/nonexistent/shrinkwrap-missing"])
        .build();
    let (mut controller, notifier, output) = build(config);

    let report = controller.start(&RealFileSystem).unwrap();
    assert_eq!(report.started.len(), 1);
    assert_eq!(report.spawn_failures, 1);
    assert!(output.wait_for_line("ok READY", Duration::from_secs(5)));

    let shutdown = controller.shutdown(StopReason::Signal(ShutdownSignal::Terminate));
    assert!(!shutdown.is_success());
    assert!(shutdown.notified);
    assert_eq!(notifier.count(NotifyState::Stopping), 1);
}

#[test]
fn start_cleans_the_temp_dir_first() {
    let fixture = ShellFixture::new("svc");
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("svc.pid"), "1").unwrap();
    std::fs::write(temp.path().join("keep.me"), "").unwrap();
    let script = fixture.script("quick.sh", "echo done\n");
    let config = ConfigBuilder::new("svc", fixture.basedir())
        .command(&["@binary", &script])
        .tempdir(temp.path())
        .build();
    let (mut controller, _notifier, _output) = build(config);

    controller.start(&RealFileSystem).unwrap();

    assert!(!temp.path().join("svc.pid").exists());
    assert!(temp.path().join("keep.me").exists());
    controller.shutdown(StopReason::Signal(ShutdownSignal::Terminate));
}

#[tokio::test]
async fn exit_with_child_stops_once_every_worker_is_gone() {
    let fixture = ShellFixture::new("svc");
    let script = fixture.script("quick.sh", "echo \"$1 done\"\n");
    let config = ConfigBuilder::new("svc", fixture.basedir())
        .command(&["@binary", &script, "a"])
        .extra_command(&["@binary", &script, "b"])
        .exit_with_child(true)
        .build();
    let (mut controller, notifier, output) = build(config);
    let mut signals = SignalListener::install().unwrap();

    controller.start(&RealFileSystem).unwrap();
    let reason = with_timeout(controller.wait_for_stop(&mut signals)).await;
    assert_eq!(reason, StopReason::WorkersExited);

    let shutdown = controller.shutdown(reason);
    assert!(shutdown.is_success());
    assert_eq!(shutdown.exits.len(), 2);
    assert!(shutdown.exits.iter().all(|e| !e.killed));
    assert_eq!(notifier.sent(), vec![NotifyState::Stopping]);

    let lines = output.lines();
    assert!(lines.iter().any(|l| l == "a done"));
    assert!(lines.iter().any(|l| l == "b done"));
}
