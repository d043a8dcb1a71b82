// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Waiting record state machine
//!
//! Transitions are pure: they take the current record and return the next
//! record plus the effects to execute. No-op transitions return the record
//! unchanged (including `updated_at`), so callers detect a needed write by
//! comparing the result against the input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::condition::WaitCondition;
use crate::effect::{Effect, Event};
use crate::handler::{Verdict, WaitAction};
use crate::process::{ProcessKey, ProcessStatus};

/// One process attempt's wait state.
///
/// Invariant: `is_waiting` implies `condition` is `Some`. The sweep only
/// visits records with `is_waiting` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingRecord {
    pub process: ProcessKey,
    /// Monotonic id assigned at creation, the sweep cursor orders by it.
    pub sequence_id: u64,
    pub is_waiting: bool,
    /// Bumped by the store on every write; transitions never touch it.
    pub version: u64,
    pub condition: Option<WaitCondition>,
    pub updated_at: DateTime<Utc>,
}

impl WaitingRecord {
    pub fn new(process: ProcessKey, sequence_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            process,
            sequence_id,
            is_waiting: false,
            version: 0,
            condition: None,
            updated_at: now,
        }
    }

    /// React to a reported lifecycle status: parked statuses arm the stored
    /// condition, final statuses clear it, everything else is a no-op.
    pub fn on_status(&self, status: ProcessStatus, clock: &impl Clock) -> (Self, Vec<Effect>) {
        if status.is_parked() {
            self.arm(clock.now())
        } else if status.is_final() {
            self.clear(clock.now())
        } else {
            (self.clone(), vec![])
        }
    }

    /// Store a new condition (arming the record) or clear it with `None`.
    /// `WaitCondition::None` is treated the same as `None`.
    pub fn set_condition(
        &self,
        condition: Option<WaitCondition>,
        clock: &impl Clock,
    ) -> (Self, Vec<Effect>) {
        let Some(condition) = condition.filter(|c| !c.is_none()) else {
            return self.clear(clock.now());
        };
        if self.is_waiting && self.condition.as_ref() == Some(&condition) {
            return (self.clone(), vec![]);
        }

        let mut effects = vec![Effect::Emit(if self.condition.is_none() {
            Event::ConditionSet {
                process: self.process,
                condition: condition.clone(),
            }
        } else {
            Event::ConditionUpdated {
                process: self.process,
                condition: condition.clone(),
            }
        })];
        if !self.is_waiting {
            effects.push(Effect::Emit(Event::RecordArmed {
                process: self.process,
            }));
        }

        let mut next = self.clone();
        next.condition = Some(condition);
        next.is_waiting = true;
        next.updated_at = clock.now();
        (next, effects)
    }

    /// Apply a handler verdict from a sweep.
    pub fn apply_verdict(&self, verdict: &Verdict, clock: &impl Clock) -> (Self, Vec<Effect>) {
        match verdict {
            Verdict::Continue(condition) => {
                if self.condition.as_ref() == Some(condition) {
                    return (self.clone(), vec![]);
                }
                let mut next = self.clone();
                next.condition = Some(condition.clone());
                next.updated_at = clock.now();
                let effects = vec![Effect::Emit(Event::ConditionUpdated {
                    process: self.process,
                    condition: condition.clone(),
                })];
                (next, effects)
            }
            Verdict::Resume(resume_event) => {
                let (next, mut effects) = self.clear(clock.now());
                effects.push(Effect::Resume {
                    process: self.process,
                    resume_event: resume_event.clone(),
                });
                (next, effects)
            }
            Verdict::Action(WaitAction::MarkRunnable { process }) => {
                let (next, mut effects) = self.clear(clock.now());
                effects.push(Effect::MarkRunnable { process: *process });
                (next, effects)
            }
        }
    }

    /// Arming requires a stored condition; without one this is a no-op.
    fn arm(&self, now: DateTime<Utc>) -> (Self, Vec<Effect>) {
        if self.is_waiting || self.condition.is_none() {
            return (self.clone(), vec![]);
        }
        let mut next = self.clone();
        next.is_waiting = true;
        next.updated_at = now;
        let effects = vec![Effect::Emit(Event::RecordArmed {
            process: self.process,
        })];
        (next, effects)
    }

    fn clear(&self, now: DateTime<Utc>) -> (Self, Vec<Effect>) {
        if self.condition.is_none() && !self.is_waiting {
            return (self.clone(), vec![]);
        }
        let mut effects = Vec::new();
        if self.condition.is_some() {
            effects.push(Effect::Emit(Event::ConditionCleared {
                process: self.process,
            }));
        }
        if self.is_waiting {
            effects.push(Effect::Emit(Event::RecordDisarmed {
                process: self.process,
            }));
        }
        let mut next = self.clone();
        next.condition = None;
        next.is_waiting = false;
        next.updated_at = now;
        (next, effects)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
