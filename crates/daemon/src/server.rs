// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use tokio::net::UnixStream;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info};

use crate::lifecycle::{DaemonState, LifecycleError};
use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Serve connections until a termination signal or a Shutdown request,
/// then tear the daemon down. Connections are handled one at a time; the
/// sweep loop runs as its own task and needs no attention here.
pub async fn run(mut daemon: DaemonState) -> Result<(), LifecycleError> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            result = daemon.listener.accept() => {
                match result {
                    Ok((stream, _)) => {
                        if let Err(e) = handle_connection(&mut daemon, stream).await {
                            error!("Error handling connection: {}", e);
                        }
                    }
                    Err(e) => error!("Error accepting connection: {}", e),
                }
                if daemon.shutdown_requested {
                    info!("Shutdown requested via IPC, shutting down...");
                    break;
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
        }
    }

    daemon.shutdown().await
}

/// Handle a single client connection
pub async fn handle_connection(
    daemon: &mut DaemonState,
    stream: UnixStream,
) -> Result<(), ServerError> {
    // Split stream for reading/writing
    let (mut reader, mut writer) = stream.into_split();

    // Read request with timeout
    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    // Handle request
    let response = handle_request(daemon, request);

    debug!("Sending response: {:?}", response);

    // Write response with timeout
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
fn handle_request(daemon: &mut DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION,
        },

        Request::StatusChanged { process, status } => {
            match daemon.lifecycle.on_status_change(&process, status) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::SetCondition { process, condition } => {
            match daemon.lifecycle.set_condition(&process, condition) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::Sweep => match daemon.watchdog.sweep() {
            Ok(stats) => Response::Sweep {
                summary: stats.into(),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::Status => {
            let uptime_secs = daemon.start_time.elapsed().as_secs();
            let (records_total, records_waiting, locks_held) = {
                let store = daemon.store.lock().unwrap_or_else(|e| e.into_inner());
                let state = store.state();
                (
                    state.record_count(),
                    state.waiting_count(),
                    state.lock_count(),
                )
            };
            let audit_sequence = daemon
                .events
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .current_sequence();

            Response::Status {
                uptime_secs,
                records_total,
                records_waiting,
                locks_held,
                audit_sequence,
            }
        }

        Request::Shutdown => {
            daemon.shutdown_requested = true;
            Response::ShuttingDown
        }
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}
