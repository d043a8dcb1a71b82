// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events for state machine orchestration

use uuid::Uuid;

use crate::condition::{ScopeKey, WaitCondition};
use crate::process::{ProcessKey, ProcessStatus};

/// Effects are side effects that state machines request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Emit an event for the audit log
    Emit(Event),
    /// Wake a parked process with an optional resume event
    Resume {
        process: ProcessKey,
        resume_event: Option<String>,
    },
    /// Hand the process back to the run queue without waking it directly
    MarkRunnable { process: ProcessKey },
}

/// Events emitted by state machines
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    // Record events
    RecordCreated {
        process: ProcessKey,
    },
    RecordArmed {
        process: ProcessKey,
    },
    RecordDisarmed {
        process: ProcessKey,
    },

    // Condition events
    ConditionSet {
        process: ProcessKey,
        condition: WaitCondition,
    },
    ConditionUpdated {
        process: ProcessKey,
        condition: WaitCondition,
    },
    ConditionCleared {
        process: ProcessKey,
    },

    // Process events
    StatusObserved {
        process: ProcessKey,
        status: ProcessStatus,
    },
    ProcessResumed {
        process: ProcessKey,
        resume_event: Option<String>,
    },
    ProcessEnqueued {
        process: ProcessKey,
    },

    // Lock events
    LockAcquired {
        key: ScopeKey,
        holder: Uuid,
    },
    LockReleased {
        key: ScopeKey,
        holder: Uuid,
    },
}

impl Event {
    /// Get the event name for pattern matching
    /// Format: "category:action"
    pub fn name(&self) -> String {
        match self {
            // Record events
            Event::RecordCreated { .. } => "record:created".to_string(),
            Event::RecordArmed { .. } => "record:armed".to_string(),
            Event::RecordDisarmed { .. } => "record:disarmed".to_string(),

            // Condition events
            Event::ConditionSet { .. } => "condition:set".to_string(),
            Event::ConditionUpdated { .. } => "condition:updated".to_string(),
            Event::ConditionCleared { .. } => "condition:cleared".to_string(),

            // Process events
            Event::StatusObserved { .. } => "process:status".to_string(),
            Event::ProcessResumed { .. } => "process:resumed".to_string(),
            Event::ProcessEnqueued { .. } => "process:enqueued".to_string(),

            // Lock events
            Event::LockAcquired { .. } => "lock:acquired".to_string(),
            Event::LockReleased { .. } => "lock:released".to_string(),
        }
    }
}
