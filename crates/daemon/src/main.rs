// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bittern daemon (bitternd)
//!
//! Background process that owns the wait-condition store and runs the
//! watchdog sweep loop for one project.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;
mod protocol;
mod server;

use std::path::PathBuf;

use tracing::{error, info};

use crate::lifecycle::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let project_root = match std::env::args().nth(1) {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir()?,
    };

    let config = Config::for_project(&project_root)?;

    // The marker goes in before tracing starts, so callers tailing the log
    // can delimit this startup attempt
    lifecycle::write_startup_marker(&config)?;
    let log_guard = lifecycle::setup_logging(&config)?;

    info!("Starting bitternd for project: {}", project_root.display());

    let daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            lifecycle::write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    info!(
        "Daemon ready, listening on {}",
        config.socket_path.display()
    );

    // Signal ready for parent process (e.g., systemd, a test waiting for startup)
    println!("READY");

    server::run(daemon).await?;

    info!("Daemon stopped");
    Ok(())
}
