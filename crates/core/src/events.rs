// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log for audit trail

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effect::Event;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log io: {0}")]
    Io(#[from] std::io::Error),
    #[error("event log json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A logged event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number
    pub sequence: u64,
    /// Wall-clock time the event was recorded
    pub recorded_at: DateTime<Utc>,
    /// The event name
    pub name: String,
    /// The full event data
    pub event: Event,
}

/// Append-only JSONL audit trail.
pub struct EventLog {
    path: PathBuf,
    sequence: u64,
}

impl EventLog {
    /// Open or create an event log at the given path
    pub fn open(path: PathBuf) -> Result<Self, EventLogError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Count existing entries to set sequence
        let sequence = if path.exists() {
            let file = File::open(&path)?;
            BufReader::new(file).lines().count() as u64
        } else {
            0
        };

        Ok(Self { path, sequence })
    }

    /// Append an event to the log
    pub fn append(
        &mut self,
        event: Event,
        at: DateTime<Utc>,
    ) -> Result<EventRecord, EventLogError> {
        self.sequence += 1;

        let record = EventRecord {
            sequence: self.sequence,
            recorded_at: at,
            name: event.name(),
            event,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(&record)?;
        writeln!(file, "{json}")?;

        Ok(record)
    }

    /// Append a batch of events sharing one timestamp
    pub fn append_all(
        &mut self,
        events: Vec<Event>,
        at: DateTime<Utc>,
    ) -> Result<(), EventLogError> {
        for event in events {
            self.append(event, at)?;
        }
        Ok(())
    }

    /// Read all events from the log
    pub fn read_all(&self) -> Result<Vec<EventRecord>, EventLogError> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }

        Ok(records)
    }

    /// Query events after a sequence number
    pub fn after(&self, sequence: u64) -> Result<Vec<EventRecord>, EventLogError> {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(|r| r.sequence > sequence).collect())
    }

    /// Get current sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
