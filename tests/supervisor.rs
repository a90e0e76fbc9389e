//! Supervisor behaviour with real child processes.

#![cfg(unix)]

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use flight::cluster::{ProcessLauncher, Supervisor, SupervisorError, SupervisorReport};
use flight::Shutdown;

fn launcher(script: &str) -> ProcessLauncher {
    let args = ["-c", script, "sh"].map(OsString::from);
    ProcessLauncher::new(PathBuf::from("sh"), args)
}

#[tokio::test]
async fn test_exiting_workers_are_replaced_until_shutdown() {
    let shutdown = Shutdown::new();
    let supervisor = Supervisor::new(launcher("sleep 0.2"), 2);
    let handle = tokio::spawn(supervisor.run(shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(900)).await;
    shutdown.trigger();

    let report = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(report.launched, 2);
    assert!(report.restarted >= 2, "report: {report:?}");
}

#[tokio::test]
async fn test_long_running_workers_are_stopped_on_shutdown() {
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(Supervisor::new(launcher("sleep 60"), 3).run(shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.trigger();

    let report = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(report, SupervisorReport { launched: 3, restarted: 0 });
}

#[tokio::test]
async fn test_missing_program_fails_at_startup() {
    let launcher = ProcessLauncher::new(PathBuf::from("/nonexistent/flight"), Vec::new());
    let result = Supervisor::new(launcher, 1).run(Shutdown::new().subscribe()).await;
    assert!(matches!(result, Err(SupervisorError::Launch { slot: 0, .. })));
}
