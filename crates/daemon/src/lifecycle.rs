// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bittern_core::{EventLog, HandlerRegistry, SystemClock, WatchdogConfig};
use bittern_engine::{EnqueueResumer, LifecycleListener, Watchdog};
use bittern_storage::WaitStore;
use fs2::FileExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory
    pub project_root: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the wait-record WAL
    pub wal_path: PathBuf,
    /// Path to the audit event log
    pub events_path: PathBuf,
}

impl Config {
    /// Create config for a project
    pub fn for_project(project_root: &Path) -> Result<Self, LifecycleError> {
        let canonical = project_root
            .canonicalize()
            .map_err(|e| LifecycleError::ProjectNotFound(project_root.to_path_buf(), e))?;

        let hash = project_hash(&canonical);
        let state_dir = state_dir()?.join("projects").join(&hash);
        let socket_dir = socket_dir()?;

        Ok(Self {
            project_root: canonical,
            socket_path: socket_dir.join(format!("{}.sock", hash)),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wait.wal"),
            events_path: state_dir.join("events.log"),
        })
    }
}

/// On-disk daemon settings, read from `.bittern/config.toml` in the project.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    watchdog: WatchdogConfig,
}

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    /// Wait-record store (shared with the watchdog)
    pub store: Arc<Mutex<WaitStore>>,
    /// Audit event log (shared with the watchdog)
    pub events: Arc<Mutex<EventLog>>,
    /// Lifecycle listener applying status reports and conditions
    pub lifecycle: LifecycleListener<SystemClock>,
    /// Watchdog, also driving the background sweep task
    pub watchdog: Arc<Watchdog<SystemClock>>,
    /// Stops the sweep task on shutdown
    shutdown_tx: watch::Sender<bool>,
    /// Background sweep task, joined on shutdown
    sweep_task: Option<JoinHandle<()>>,
    /// When daemon started
    pub start_time: Instant,
    /// Shutdown requested flag
    pub shutdown_requested: bool,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // Stop the sweep loop and wait for any in-flight sweep to finish
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.sweep_task.take() {
            let _ = task.await;
        }

        for (name, path) in runtime_files(&self.config) {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Failed to remove {} file: {}", name, e);
                }
            }
        }

        // The flock on lock_file releases when self drops
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Project not found at {0}: {1}")]
    ProjectNotFound(PathBuf, std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] bittern_storage::StoreError),

    #[error("Event log error: {0}")]
    Events(#[from] bittern_core::EventLogError),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories (state dir for lock and logs, socket dir)
    if let Some(parent) = config.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Reborrow as immutable

    // 3. Write version file
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 4. Load watchdog settings BEFORE binding the socket (fail fast on a bad
    //    config, don't accept connections)
    let watchdog_config = load_watchdog_config(&config.project_root)?;

    // 5. Replay the WAL into the store and open the audit log
    let store = WaitStore::open(&config.wal_path)?;
    info!(
        "Loaded state: {} records ({} waiting), {} locks held",
        store.state().record_count(),
        store.state().waiting_count(),
        store.state().lock_count()
    );
    report_recovered_state(&store);
    let store = Arc::new(Mutex::new(store));
    let events = Arc::new(Mutex::new(EventLog::open(config.events_path.clone())?));

    // 6. Wire the listener and watchdog over the shared store
    let lifecycle = LifecycleListener::new(Arc::clone(&store), Arc::clone(&events), SystemClock);
    let watchdog = Arc::new(Watchdog::new(
        Arc::clone(&store),
        Arc::clone(&events),
        HandlerRegistry::with_builtins(),
        Arc::new(EnqueueResumer::new(Arc::clone(&store), SystemClock)),
        SystemClock,
        watchdog_config,
    ));

    // 7. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 8. Spawn the sweep loop as a sibling task sharing the store
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_task = tokio::spawn({
        let watchdog = Arc::clone(&watchdog);
        async move { watchdog.run(shutdown_rx).await }
    });

    info!(
        "Daemon started for project: {}",
        config.project_root.display()
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        store,
        events,
        lifecycle,
        watchdog,
        shutdown_tx,
        sweep_task: Some(sweep_task),
        start_time: Instant::now(),
        shutdown_requested: false,
    })
}

/// Files a running daemon owns besides its logs and state.
fn runtime_files(config: &Config) -> [(&'static str, PathBuf); 3] {
    [
        ("socket", config.socket_path.clone()),
        ("PID", config.lock_path.clone()),
        ("version", config.version_path.clone()),
    ]
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    for (_, path) in runtime_files(config) {
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
    }
}

/// Load watchdog settings from the project, falling back to defaults when no
/// config file exists.
fn load_watchdog_config(project_root: &Path) -> Result<WatchdogConfig, LifecycleError> {
    let path = project_root.join(".bittern/config.toml");

    if !path.exists() {
        return Ok(WatchdogConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let file: ConfigFile = toml::from_str(&content)?;
    Ok(file.watchdog)
}

/// Report replayed state that may need attention.
///
/// A crash between a final status write and its lock release leaves locks
/// held by finished processes; the next final report for the holder releases
/// them. Waiting records need no repair, the sweep re-evaluates them.
fn report_recovered_state(store: &WaitStore) {
    let waiting = store.state().waiting_count();
    if waiting > 0 {
        info!("Watching {} parked processes from the previous run", waiting);
    }

    let stale: Vec<_> = store
        .state()
        .locks()
        .filter(|row| {
            store
                .state()
                .status_of(row.holder)
                .is_some_and(|status| status.is_final())
        })
        .collect();
    if !stale.is_empty() {
        warn!("Found {} locks held by finished processes", stale.len());
        for row in &stale {
            warn!("  - {} held by {}", row.key, row.holder);
        }
    }
}

/// Get the state directory for bittern
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("bittern"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/bittern"))
}

/// Get the socket directory for bittern
///
/// Uses /tmp/bittern by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with BITTERN_SOCKET_DIR for testing.
fn socket_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("BITTERN_SOCKET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(PathBuf::from("/tmp/bittern"))
}

/// Compute project hash for unique daemon directory
fn project_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    // Take first 16 chars of hex digest
    hex_encode(&result[..8])
}

// Hex encoding helper
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Startup marker prefix written to log before anything else.
/// Callers use this to find where the current startup attempt begins.
/// Full format: "--- bitternd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- bitternd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
pub fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{})", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write a startup error synchronously to the log file. Tracing is
/// non-blocking and may not flush before a fast exit; this line always
/// lands.
pub fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

/// Route tracing output to the daemon log file. The returned guard keeps
/// the writer thread alive; drop it last.
pub fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
