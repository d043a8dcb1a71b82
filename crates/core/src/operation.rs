// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations for the write-ahead log
//!
//! State is rebuilt by replaying operations in order, so every operation
//! carries everything needed to apply it deterministically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::condition::ScopeKey;
use crate::process::{ProcessKey, ProcessStatus};
use crate::record::WaitingRecord;

/// Operations that can be persisted to the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a waiting record
    RecordCreate { record: WaitingRecord },

    /// Replace a waiting record wholesale
    RecordUpdate { record: WaitingRecord },

    /// Record the latest reported status of an instance
    StatusUpsert {
        process: ProcessKey,
        status: ProcessStatus,
        at: DateTime<Utc>,
    },

    /// Grant a named lock to a holder
    LockAcquire {
        key: ScopeKey,
        holder: Uuid,
        at: DateTime<Utc>,
    },

    /// Release every lock held by a holder
    LockReleaseHeldBy { holder: Uuid },
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
