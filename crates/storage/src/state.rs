// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use std::collections::HashMap;

use bittern_core::{Operation, ProcessKey, ProcessStatus, ScopeKey, WaitingRecord};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Latest reported status for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRow {
    pub process: ProcessKey,
    pub status: ProcessStatus,
    pub updated_at: DateTime<Utc>,
}

/// A granted lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRow {
    pub key: ScopeKey,
    pub holder: Uuid,
    pub acquired_at: DateTime<Utc>,
}

/// Materialized state built from WAL operations
///
/// All mutation goes through [`MaterializedState::apply`], so replay and
/// live writes converge on the same state.
#[derive(Debug, Default)]
pub struct MaterializedState {
    records: HashMap<ProcessKey, WaitingRecord>,
    statuses: HashMap<Uuid, StatusRow>,
    locks: HashMap<String, LockRow>,
    last_sequence_id: u64,
}

impl MaterializedState {
    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::RecordCreate { record } | Operation::RecordUpdate { record } => {
                self.last_sequence_id = self.last_sequence_id.max(record.sequence_id);
                self.records.insert(record.process, record.clone());
            }

            Operation::StatusUpsert {
                process,
                status,
                at,
            } => {
                self.statuses.insert(
                    process.instance_id,
                    StatusRow {
                        process: *process,
                        status: *status,
                        updated_at: *at,
                    },
                );
            }

            Operation::LockAcquire { key, holder, at } => {
                self.locks.insert(
                    key.storage_key(),
                    LockRow {
                        key: key.clone(),
                        holder: *holder,
                        acquired_at: *at,
                    },
                );
            }

            Operation::LockReleaseHeldBy { holder } => {
                self.locks.retain(|_, row| row.holder != *holder);
            }
        }
    }

    pub fn record(&self, process: &ProcessKey) -> Option<&WaitingRecord> {
        self.records.get(process)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.records.values().filter(|r| r.is_waiting).count()
    }

    /// Waiting records past the cursor, ordered by sequence id, at most
    /// `page_size` of them.
    pub fn page_waiting(&self, cursor: u64, page_size: usize) -> Vec<WaitingRecord> {
        let mut page: Vec<WaitingRecord> = self
            .records
            .values()
            .filter(|r| r.is_waiting && r.sequence_id > cursor)
            .cloned()
            .collect();
        page.sort_by_key(|r| r.sequence_id);
        page.truncate(page_size);
        page
    }

    pub fn status_of(&self, instance_id: Uuid) -> Option<ProcessStatus> {
        self.statuses.get(&instance_id).map(|row| row.status)
    }

    pub fn status_row(&self, instance_id: Uuid) -> Option<&StatusRow> {
        self.statuses.get(&instance_id)
    }

    pub fn lock_holder(&self, key: &ScopeKey) -> Option<Uuid> {
        self.locks.get(&key.storage_key()).map(|row| row.holder)
    }

    pub fn locks_held_by(&self, holder: Uuid) -> Vec<LockRow> {
        let mut held: Vec<LockRow> = self
            .locks
            .values()
            .filter(|row| row.holder == holder)
            .cloned()
            .collect();
        held.sort_by_key(|row| row.key.storage_key());
        held
    }

    pub fn locks(&self) -> impl Iterator<Item = &LockRow> {
        self.locks.values()
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Sequence id for the next record to be created.
    pub fn next_sequence_id(&self) -> u64 {
        self.last_sequence_id + 1
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
