//! Daemon lifecycle specs
//!
//! Verify daemon startup, the handshake requests, state files, and shutdown.

use crate::prelude::*;

#[test]
fn ping_answers_pong() {
    let temp = Project::empty();
    let daemon = temp.daemon();

    assert!(matches!(daemon.request(&Request::Ping), Response::Pong));
}

#[test]
fn hello_reports_the_protocol_version() {
    let temp = Project::empty();
    let daemon = temp.daemon();

    match daemon.request(&Request::Hello { version: 1 }) {
        Response::Hello { version } => assert_eq!(version, 1),
        other => panic!("Hello returned {other:?}"),
    }
}

#[test]
fn status_reports_empty_counters_on_a_fresh_daemon() {
    let temp = Project::empty();
    let daemon = temp.daemon();

    let status = daemon.status();
    assert_eq!(status.records_total, 0);
    assert_eq!(status.records_waiting, 0);
    assert_eq!(status.locks_held, 0);
    assert_eq!(status.audit_sequence, 0);
}

#[test]
fn daemon_creates_version_file() {
    let temp = Project::empty();
    let _daemon = temp.daemon();

    let has_version = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.project_state_dir()
            .map(|state| state.join("daemon.version").exists())
            .unwrap_or(false)
    });

    assert!(has_version, "daemon.version file should exist");
}

#[test]
fn daemon_creates_pid_file() {
    let temp = Project::empty();
    let _daemon = temp.daemon();

    let has_pid = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.project_state_dir()
            .map(|state| state.join("daemon.pid").exists())
            .unwrap_or(false)
    });

    assert!(has_pid, "daemon.pid file should exist");
}

#[test]
fn daemon_creates_socket_file() {
    let temp = Project::empty();
    let _daemon = temp.daemon();

    let has_socket = wait_for(SPEC_WAIT_MAX_MS, || {
        std::fs::read_dir(temp.state_path())
            .ok()
            .map(|entries| {
                entries.filter_map(|e| e.ok()).any(|entry| {
                    entry
                        .path()
                        .extension()
                        .map(|ext| ext == "sock")
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    });

    assert!(has_socket, "daemon socket file should exist");
}

#[test]
fn daemon_logs_a_startup_marker() {
    let temp = Project::empty();
    let _daemon = temp.daemon();

    let has_marker = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.daemon_log().contains("--- bitternd: starting (pid: ")
    });

    assert!(has_marker, "log should contain the startup marker");
}

#[test]
fn daemon_logs_ready_after_binding() {
    let temp = Project::empty();
    let _daemon = temp.daemon();

    let has_ready = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.daemon_log().contains("Daemon ready, listening on")
    });

    assert!(has_ready, "log should record the listening socket");
}

#[test]
fn shutdown_removes_socket_and_pid_files() {
    let temp = Project::empty();
    let daemon = temp.daemon();
    let state = temp.project_state_dir().unwrap();
    assert!(state.join("daemon.pid").exists());

    daemon.shutdown();

    assert!(!state.join("daemon.pid").exists(), "pid file should be removed");
    assert!(
        !state.join("daemon.version").exists(),
        "version file should be removed"
    );
    let socket_left = std::fs::read_dir(temp.state_path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "sock")
                .unwrap_or(false)
        });
    assert!(!socket_left, "socket file should be removed");
}

#[test]
fn second_daemon_refuses_to_start_while_first_holds_the_lock() {
    let temp = Project::empty();
    let _daemon = temp.daemon();

    temp.daemon_fails();

    assert!(
        temp.daemon_log().contains("Failed to acquire lock"),
        "log should record the lock conflict:\n{}",
        temp.daemon_log()
    );
}

#[test]
fn daemon_can_restart_after_shutdown() {
    let temp = Project::empty();
    temp.daemon().shutdown();

    let daemon = temp.daemon();
    assert!(matches!(daemon.request(&Request::Ping), Response::Pong));
}

#[test]
fn invalid_watchdog_config_fails_startup() {
    let temp = Project::empty();
    temp.file(".bittern/config.toml", "[watchdog]\npoll_interval = 7\n");

    temp.daemon_fails();

    assert!(
        temp.daemon_log().contains("Failed to start daemon"),
        "log should record the config error:\n{}",
        temp.daemon_log()
    );
}

#[test]
fn forced_sweep_reports_an_empty_summary() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let summary = daemon.sweep();
    assert_eq!(summary.visited, 0);
    assert_eq!(summary.resumed, 0);
    assert_eq!(summary.failures, 0);
}
