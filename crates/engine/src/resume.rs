// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resume seam between the wait engine and the execution side

use std::sync::{Arc, Mutex};

use bittern_core::{Clock, ProcessKey, ProcessStatus};
use bittern_storage::WaitStore;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("resume: {0}")]
pub struct ResumeError(pub String);

/// Wakes a parked process. The engine clears the waiting record before
/// calling this, so a failed resume is logged, not retried via the record.
pub trait ProcessResumer: Send + Sync {
    fn resume(&self, process: &ProcessKey, resume_event: Option<&str>) -> Result<(), ResumeError>;
}

/// Stand-in for a full execution engine: marks the process ENQUEUED in the
/// store so a run queue can pick it up.
pub struct EnqueueResumer<C: Clock> {
    store: Arc<Mutex<WaitStore>>,
    clock: C,
}

impl<C: Clock> EnqueueResumer<C> {
    pub fn new(store: Arc<Mutex<WaitStore>>, clock: C) -> Self {
        Self { store, clock }
    }
}

impl<C: Clock> ProcessResumer for EnqueueResumer<C> {
    fn resume(&self, process: &ProcessKey, _resume_event: Option<&str>) -> Result<(), ResumeError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store
            .upsert_status(*process, ProcessStatus::Enqueued, self.clock.now())
            .map_err(|e| ResumeError(e.to_string()))
    }
}

/// Records resume calls instead of acting on them. Test double.
#[derive(Default)]
pub struct RecordingResumer {
    resumed: Mutex<Vec<(ProcessKey, Option<String>)>>,
}

impl RecordingResumer {
    pub fn resumed(&self) -> Vec<(ProcessKey, Option<String>)> {
        self.resumed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ProcessResumer for RecordingResumer {
    fn resume(&self, process: &ProcessKey, resume_event: Option<&str>) -> Result<(), ResumeError> {
        self.resumed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((*process, resume_event.map(str::to_string)));
        Ok(())
    }
}
