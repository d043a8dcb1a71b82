//! Shared helpers for daemon specs.
//!
//! Each spec gets an isolated project root, state directory, and socket
//! directory inside a temp dir. `Daemon` spawns the bitternd binary, waits
//! for its READY line, and speaks the length-prefixed JSON protocol over
//! the Unix socket.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::cargo::CommandCargoExt;
use tempfile::TempDir;

pub use bittern_core::{
    CompletionCondition, LockCondition, ProcessKey, ProcessStatus, SleepCondition, WaitCondition,
};
pub use bittern_daemon::{Request, Response, SweepSummary};
pub use chrono::Utc;
pub use uuid::Uuid;

/// Maximum time to wait for an expected daemon-side effect.
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Poll `check` until it returns true or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// A fresh process key for spec scenarios.
pub fn process() -> ProcessKey {
    ProcessKey::new(Uuid::new_v4(), Utc::now())
}

/// An isolated project with its own state and socket directories.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        std::fs::create_dir_all(dir.path().join("state")).unwrap();
        Self { dir }
    }

    /// The project root the daemon is pointed at.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    /// The isolated XDG state directory. Sockets land here too.
    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    /// Write a file under the project root, creating parent directories.
    pub fn file(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Push the background sweep far out so specs drive sweeps explicitly.
    pub fn quiet_watchdog(&self) {
        self.file(".bittern/config.toml", "[watchdog]\npoll_interval = \"1h\"\n");
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("bitternd").unwrap();
        cmd.arg(self.path())
            .env("XDG_STATE_HOME", self.state_path())
            .env("BITTERN_SOCKET_DIR", self.state_path())
            .env_remove("RUST_LOG");
        cmd
    }

    /// Spawn the daemon and wait until it reports READY on stdout.
    pub fn daemon(&self) -> Daemon {
        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());
        let mut daemon = Daemon {
            child,
            _stdout: stdout,
            socket: PathBuf::new(),
        };
        daemon.await_ready(self);
        daemon
    }

    /// Spawn the daemon and require startup to fail, returning its stderr.
    pub fn daemon_fails(&self) -> String {
        let output = self.command().output().unwrap();
        assert!(
            !output.status.success(),
            "daemon unexpectedly started: stdout={:?}",
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).into_owned()
    }

    /// This project's state directory, once the daemon has created it.
    pub fn project_state_dir(&self) -> Option<PathBuf> {
        let projects = self.state_path().join("bittern/projects");
        std::fs::read_dir(projects)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| p.is_dir())
    }

    /// Audit event names recorded for this project, in write order.
    pub fn audit_names(&self) -> Vec<String> {
        let Some(state) = self.project_state_dir() else {
            return Vec::new();
        };
        let Ok(content) = std::fs::read_to_string(state.join("events.log")) else {
            return Vec::new();
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["name"].as_str().unwrap().to_string()
            })
            .collect()
    }

    /// Contents of the daemon log file, or empty if missing.
    pub fn daemon_log(&self) -> String {
        self.project_state_dir()
            .and_then(|state| std::fs::read_to_string(state.join("daemon.log")).ok())
            .unwrap_or_default()
    }
}

/// Fields of a Status response, unpacked for assertions.
pub struct StatusReport {
    pub uptime_secs: u64,
    pub records_total: usize,
    pub records_waiting: usize,
    pub locks_held: usize,
    pub audit_sequence: u64,
}

/// A running bitternd process plus its socket path.
pub struct Daemon {
    child: Child,
    // Held so the daemon's stdout pipe stays open.
    _stdout: BufReader<ChildStdout>,
    socket: PathBuf,
}

impl Daemon {
    fn await_ready(&mut self, project: &Project) {
        let mut line = String::new();
        loop {
            line.clear();
            match self._stdout.read_line(&mut line) {
                Ok(0) => panic!(
                    "daemon exited before READY; log:\n{}",
                    project.daemon_log()
                ),
                Ok(_) if line.trim() == "READY" => break,
                Ok(_) => continue,
                Err(e) => panic!("failed reading daemon stdout: {e}"),
            }
        }
        let socket_dir = project.state_path();
        let mut found = None;
        wait_for(SPEC_WAIT_MAX_MS, || {
            found = std::fs::read_dir(&socket_dir).ok().and_then(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .find(|p| p.extension().is_some_and(|ext| ext == "sock"))
            });
            found.is_some()
        });
        self.socket = found
            .unwrap_or_else(|| panic!("socket never appeared; log:\n{}", project.daemon_log()));
    }

    /// Send one request over a fresh connection and read the response.
    pub fn request(&self, request: &Request) -> Response {
        let mut stream = UnixStream::connect(&self.socket).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(SPEC_WAIT_MAX_MS)))
            .unwrap();
        let data = serde_json::to_vec(request).unwrap();
        let len = u32::try_from(data.len()).unwrap();
        stream.write_all(&len.to_be_bytes()).unwrap();
        stream.write_all(&data).unwrap();
        stream.flush().unwrap();

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).unwrap();
        serde_json::from_slice(&payload).unwrap()
    }

    /// Report a status change, expecting Ok.
    pub fn report(&self, process: ProcessKey, status: ProcessStatus) {
        match self.request(&Request::StatusChanged { process, status }) {
            Response::Ok => {}
            other => panic!("StatusChanged returned {other:?}"),
        }
    }

    /// Set or clear a wait condition, expecting Ok.
    pub fn set_condition(&self, process: ProcessKey, condition: Option<WaitCondition>) {
        match self.request(&Request::SetCondition { process, condition }) {
            Response::Ok => {}
            other => panic!("SetCondition returned {other:?}"),
        }
    }

    /// Set a condition and report the process waiting, arming its record.
    pub fn park(&self, process: ProcessKey, condition: WaitCondition) {
        self.set_condition(process, Some(condition));
        self.report(process, ProcessStatus::Waiting);
    }

    /// Force a sweep and return its summary.
    pub fn sweep(&self) -> SweepSummary {
        match self.request(&Request::Sweep) {
            Response::Sweep { summary } => summary,
            other => panic!("Sweep returned {other:?}"),
        }
    }

    /// Fetch the daemon's status counters.
    pub fn status(&self) -> StatusReport {
        match self.request(&Request::Status) {
            Response::Status {
                uptime_secs,
                records_total,
                records_waiting,
                locks_held,
                audit_sequence,
            } => StatusReport {
                uptime_secs,
                records_total,
                records_waiting,
                locks_held,
                audit_sequence,
            },
            other => panic!("Status returned {other:?}"),
        }
    }

    /// Request shutdown and wait for the process to exit.
    pub fn shutdown(mut self) {
        match self.request(&Request::Shutdown) {
            Response::ShuttingDown => {}
            other => panic!("Shutdown returned {other:?}"),
        }
        let exited = wait_for(SPEC_WAIT_MAX_MS, || {
            matches!(self.child.try_wait(), Ok(Some(_)))
        });
        assert!(exited, "daemon should exit after Shutdown");
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
