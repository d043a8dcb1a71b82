// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process attempt identity and lifecycle status

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one process attempt: the instance id paired with the
/// attempt's creation timestamp. An instance id alone is ambiguous across
/// restarts of the same process, so both halves travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessKey {
    pub instance_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ProcessKey {
    pub fn new(instance_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            instance_id,
            created_at,
        }
    }

    /// Canonical string form for map and file keys.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.instance_id, self.created_at.timestamp_millis())
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.instance_id, self.created_at.to_rfc3339())
    }
}

/// Lifecycle status of a process attempt as reported by the execution
/// engine. The wait engine only partitions these: statuses that precede a
/// possible wait, statuses during which a stored condition is polled, and
/// the final statuses after which the attempt never runs again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    New,
    Preparing,
    Enqueued,
    Starting,
    Running,
    Waiting,
    Suspended,
    Resuming,
    Finished,
    Failed,
    Cancelled,
    TimedOut,
}

impl ProcessStatus {
    /// Terminal statuses: the attempt will never run again.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Failed | Self::Cancelled | Self::TimedOut
        )
    }

    /// Early statuses that guarantee a waiting record exists before the
    /// attempt could possibly suspend.
    pub fn is_initializing(&self) -> bool {
        matches!(self, Self::New | Self::Preparing)
    }

    /// Statuses during which a stored condition is actively polled.
    pub fn is_parked(&self) -> bool {
        matches!(self, Self::Waiting | Self::Suspended)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Preparing => "PREPARING",
            Self::Enqueued => "ENQUEUED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Suspended => "SUSPENDED",
            Self::Resuming => "RESUMING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::TimedOut => "TIMED_OUT",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
