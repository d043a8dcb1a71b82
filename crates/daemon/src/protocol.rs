// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for daemon IPC.
//!
//! Messages are framed as a 4-byte big-endian length prefix followed by a
//! JSON payload. `encode`/`decode` handle the JSON half; `read_message`/
//! `write_message` handle the framing.

use std::time::Duration;

use bittern_core::{ProcessKey, ProcessStatus, WaitCondition};
use bittern_engine::SweepStats;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version, negotiated via `Hello`.
pub const PROTOCOL_VERSION: u32 = 1;

/// Frames larger than this are rejected before the payload is allocated.
pub const MAX_FRAME_BYTES: u32 = 4 * 1024 * 1024;

/// Default timeout for a single read or write.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Operation timed out")]
    Timeout,

    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(u64),
}

/// Requests accepted over the daemon socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Ping,

    Hello {
        version: u32,
    },

    /// Lifecycle notification: `process` was observed in `status`.
    StatusChanged {
        process: ProcessKey,
        status: ProcessStatus,
    },

    /// Store the condition `process` will wait on, or clear it with `None`.
    SetCondition {
        process: ProcessKey,
        condition: Option<WaitCondition>,
    },

    /// Run one watchdog sweep now and report what it did.
    Sweep,

    Status,

    Shutdown,
}

/// Responses sent back over the daemon socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Hello {
        version: u32,
    },

    Ok,

    Error {
        message: String,
    },

    Sweep {
        summary: SweepSummary,
    },

    Status {
        uptime_secs: u64,
        records_total: usize,
        records_waiting: usize,
        locks_held: usize,
        audit_sequence: u64,
    },

    ShuttingDown,
}

/// Counters from one forced sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub visited: usize,
    pub resumed: usize,
    pub enqueued: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failures: usize,
    pub lost_races: usize,
}

impl From<SweepStats> for SweepSummary {
    fn from(stats: SweepStats) -> Self {
        Self {
            visited: stats.visited,
            resumed: stats.resumed,
            enqueued: stats.enqueued,
            updated: stats.updated,
            unchanged: stats.unchanged,
            skipped: stats.skipped,
            failures: stats.failures,
            lost_races: stats.lost_races,
        }
    }
}

/// Encode a message as JSON bytes (no length prefix).
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode a message from JSON bytes.
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one length-prefixed message.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(map_eof)?;

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(u64::from(len)));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(map_eof)?;
    Ok(payload)
}

/// Write one length-prefixed message.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_FRAME_BYTES as usize {
        return Err(ProtocolError::FrameTooLarge(data.len() as u64));
    }

    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode a request, failing if `timeout` elapses first.
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Encode and write a response, failing if `timeout` elapses first.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

fn map_eof(err: std::io::Error) -> ProtocolError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionClosed
    } else {
        ProtocolError::Io(err)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
