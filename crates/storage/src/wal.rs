// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log for durable storage

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use bittern_core::Operation;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WalEntry {
    seq: u64,
    at: DateTime<Utc>,
    op: Operation,
    crc: u32,
}

/// Checksum covers the serialized operation only.
fn checksum(op: &Operation) -> Result<u32, serde_json::Error> {
    Ok(crc32fast::hash(&serde_json::to_vec(op)?))
}

/// Write-ahead log for durable operation storage
pub struct Wal {
    path: PathBuf,
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create a WAL at the given path
    pub fn open(path: &Path) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        let sequence = read_entries(path)?.last().map_or(0, |entry| entry.seq);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sequence,
        })
    }

    /// Append an operation to the log
    pub fn append(&mut self, op: &Operation, at: DateTime<Utc>) -> Result<u64, WalError> {
        self.sequence += 1;
        let entry = WalEntry {
            seq: self.sequence,
            at,
            op: op.clone(),
            crc: checksum(op)?,
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{line}")?;
        self.file.sync_all()?;
        Ok(self.sequence)
    }

    /// Get the current sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay all operations from the log
    pub fn replay(path: &Path) -> Result<Vec<Operation>, WalError> {
        Ok(read_entries(path)?
            .into_iter()
            .map(|entry| entry.op)
            .collect())
    }
}

fn read_entries(path: &Path) -> Result<Vec<WalEntry>, WalError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let lines: Vec<String> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
    let last_index = lines.len().saturating_sub(1);
    let mut entries = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        match parse_entry(line) {
            Ok(entry) => entries.push(entry),
            // A torn final line means the writer died mid-append; drop it.
            Err(_) if index == last_index => break,
            Err(reason) => {
                return Err(WalError::Corrupt {
                    line: index + 1,
                    reason,
                });
            }
        }
    }

    Ok(entries)
}

fn parse_entry(line: &str) -> Result<WalEntry, String> {
    let entry: WalEntry = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let computed = checksum(&entry.op).map_err(|e| e.to_string())?;
    if entry.crc != computed {
        return Err(format!(
            "checksum mismatch (stored {}, computed {computed})",
            entry.crc
        ));
    }
    Ok(entry)
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
