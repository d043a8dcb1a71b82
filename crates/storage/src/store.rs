// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Waiting-record store: WAL in front, materialized state behind
//!
//! The store is the single writer. Record versions move only here:
//! [`WaitStore::put_record`] writes unconditionally, while the sweep goes
//! through [`WaitStore::cas_record`] and loses cleanly to concurrent
//! lifecycle writes.

use std::path::Path;

use bittern_core::{Operation, ProcessKey, ProcessStatus, ScopeKey, WaitingRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::state::{LockRow, MaterializedState};
use crate::wal::{Wal, WalError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Wal(#[from] WalError),
}

/// Outcome of a compare-and-set write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    Lost,
}

/// The holder after a lock acquisition attempt, and whether this call
/// granted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockGrant {
    pub holder: Uuid,
    pub acquired: bool,
}

pub struct WaitStore {
    wal: Wal,
    state: MaterializedState,
}

impl WaitStore {
    /// Open the store, replaying any existing log.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut state = MaterializedState::default();
        for op in Wal::replay(path)? {
            state.apply(&op);
        }
        let wal = Wal::open(path)?;
        Ok(Self { wal, state })
    }

    pub fn state(&self) -> &MaterializedState {
        &self.state
    }

    fn commit(&mut self, op: Operation, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.wal.append(&op, at)?;
        self.state.apply(&op);
        Ok(())
    }

    /// Create a record for the process if none exists yet. Returns the
    /// record only when this call created it.
    pub fn ensure_record(
        &mut self,
        process: ProcessKey,
        now: DateTime<Utc>,
    ) -> Result<Option<WaitingRecord>, StoreError> {
        let (record, created) = self.record_or_create(process, now)?;
        Ok(created.then_some(record))
    }

    /// Fetch the record, creating a dormant one if missing.
    pub fn record_or_create(
        &mut self,
        process: ProcessKey,
        now: DateTime<Utc>,
    ) -> Result<(WaitingRecord, bool), StoreError> {
        if let Some(existing) = self.state.record(&process) {
            return Ok((existing.clone(), false));
        }
        let record = WaitingRecord::new(process, self.state.next_sequence_id(), now);
        self.commit(
            Operation::RecordCreate {
                record: record.clone(),
            },
            now,
        )?;
        Ok((record, true))
    }

    pub fn record(&self, process: &ProcessKey) -> Option<WaitingRecord> {
        self.state.record(process).cloned()
    }

    /// Unconditional write. Bumps the stored version and returns the final
    /// record.
    pub fn put_record(
        &mut self,
        record: WaitingRecord,
        now: DateTime<Utc>,
    ) -> Result<WaitingRecord, StoreError> {
        let mut next = record;
        next.version = self.state.record(&next.process).map_or(0, |r| r.version) + 1;
        self.commit(
            Operation::RecordUpdate {
                record: next.clone(),
            },
            now,
        )?;
        Ok(next)
    }

    /// Write only if the stored version still matches `expected_version`.
    pub fn cas_record(
        &mut self,
        record: WaitingRecord,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, StoreError> {
        let stored = self.state.record(&record.process).map_or(0, |r| r.version);
        if stored != expected_version {
            return Ok(CasOutcome::Lost);
        }
        let mut next = record;
        next.version = expected_version + 1;
        self.commit(Operation::RecordUpdate { record: next }, now)?;
        Ok(CasOutcome::Applied)
    }

    pub fn upsert_status(
        &mut self,
        process: ProcessKey,
        status: ProcessStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.commit(
            Operation::StatusUpsert {
                process,
                status,
                at,
            },
            at,
        )
    }

    /// Grant the lock if it is free; report the holder either way.
    pub fn try_acquire(
        &mut self,
        key: &ScopeKey,
        requester: Uuid,
        at: DateTime<Utc>,
    ) -> Result<LockGrant, StoreError> {
        if let Some(holder) = self.state.lock_holder(key) {
            return Ok(LockGrant {
                holder,
                acquired: false,
            });
        }
        self.commit(
            Operation::LockAcquire {
                key: key.clone(),
                holder: requester,
                at,
            },
            at,
        )?;
        Ok(LockGrant {
            holder: requester,
            acquired: true,
        })
    }

    /// Release every lock the holder owns, returning the released rows.
    /// Writes nothing when the holder owns none.
    pub fn release_held_by(
        &mut self,
        holder: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<LockRow>, StoreError> {
        let released = self.state.locks_held_by(holder);
        if released.is_empty() {
            return Ok(released);
        }
        self.commit(Operation::LockReleaseHeldBy { holder }, at)?;
        Ok(released)
    }

    pub fn page_waiting(&self, cursor: u64, page_size: usize) -> Vec<WaitingRecord> {
        self.state.page_waiting(cursor, page_size)
    }

    pub fn status_of(&self, instance_id: Uuid) -> Option<ProcessStatus> {
        self.state.status_of(instance_id)
    }

    /// WAL high-water mark; stays put across calls that write nothing.
    pub fn wal_sequence(&self) -> u64 {
        self.wal.sequence()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
