// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle listener: applies reported status changes to waiting records

use std::sync::{Arc, Mutex};

use bittern_core::{Clock, Effect, Event, EventLog, ProcessKey, ProcessStatus, WaitCondition};
use bittern_storage::WaitStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::EngineError;

/// Listens to status reports from the execution side and keeps the waiting
/// record in step: early statuses ensure a record exists, parked statuses
/// arm the stored condition, final statuses clear it and free held locks.
pub struct LifecycleListener<C: Clock> {
    store: Arc<Mutex<WaitStore>>,
    events: Arc<Mutex<EventLog>>,
    clock: C,
}

fn emitted(effects: Vec<Effect>) -> impl Iterator<Item = Event> {
    effects.into_iter().filter_map(|effect| match effect {
        Effect::Emit(event) => Some(event),
        _ => None,
    })
}

impl<C: Clock> LifecycleListener<C> {
    pub fn new(store: Arc<Mutex<WaitStore>>, events: Arc<Mutex<EventLog>>, clock: C) -> Self {
        Self {
            store,
            events,
            clock,
        }
    }

    /// Handle one reported status change. Replayed reports are no-ops: no
    /// write, no audit event.
    pub fn on_status_change(
        &self,
        process: &ProcessKey,
        status: ProcessStatus,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let mut pending = Vec::new();
        {
            let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());

            let replayed = store
                .state()
                .status_row(process.instance_id)
                .map(|row| (row.process, row.status))
                == Some((*process, status));
            if !replayed {
                store.upsert_status(*process, status, now)?;
                pending.push(Event::StatusObserved {
                    process: *process,
                    status,
                });
            }

            if status.is_initializing() {
                if let Some(record) = store.ensure_record(*process, now)? {
                    debug!(
                        process = %process,
                        sequence_id = record.sequence_id,
                        "waiting record created"
                    );
                    pending.push(Event::RecordCreated { process: *process });
                }
            } else if let Some(record) = store.record(process) {
                let (next, effects) = record.on_status(status, &self.clock);
                if next != record {
                    store.put_record(next, now)?;
                }
                pending.extend(emitted(effects));
            }

            if status.is_final() {
                for row in store.release_held_by(process.instance_id, now)? {
                    info!(process = %process, key = %row.key, "lock released on final status");
                    pending.push(Event::LockReleased {
                        key: row.key,
                        holder: row.holder,
                    });
                }
            }
        }
        self.append_events(pending, now)
    }

    /// Store the condition a process will wait on, or clear it with `None`.
    /// Creates the record when the process has never been reported.
    pub fn set_condition(
        &self,
        process: &ProcessKey,
        condition: Option<WaitCondition>,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();
        let mut pending = Vec::new();
        {
            let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
            let (record, created) = store.record_or_create(*process, now)?;
            if created {
                pending.push(Event::RecordCreated { process: *process });
            }
            let (next, effects) = record.set_condition(condition, &self.clock);
            if next != record {
                store.put_record(next, now)?;
            }
            pending.extend(emitted(effects));
        }
        self.append_events(pending, now)
    }

    fn append_events(&self, events: Vec<Event>, at: DateTime<Utc>) -> Result<(), EngineError> {
        if events.is_empty() {
            return Ok(());
        }
        let mut log = self.events.lock().unwrap_or_else(|e| e.into_inner());
        log.append_all(events, at)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
