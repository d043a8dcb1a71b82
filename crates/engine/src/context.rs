// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store-backed handler context used during sweeps

use bittern_core::{Event, HandlerContext, HandlerError, ProcessStatus, ScopeKey};
use bittern_storage::WaitStore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Handler context over the live store. Lock grants are audited, so the
/// events are collected here and appended once the store guard is gone.
pub(crate) struct StoreContext<'a> {
    store: &'a mut WaitStore,
    now: DateTime<Utc>,
    events: Vec<Event>,
}

impl<'a> StoreContext<'a> {
    pub(crate) fn new(store: &'a mut WaitStore, now: DateTime<Utc>) -> Self {
        Self {
            store,
            now,
            events: Vec::new(),
        }
    }

    pub(crate) fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl HandlerContext for StoreContext<'_> {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn status_of(&self, instance_id: Uuid) -> Option<ProcessStatus> {
        self.store.status_of(instance_id)
    }

    fn try_acquire(&mut self, key: &ScopeKey, requester: Uuid) -> Result<Uuid, HandlerError> {
        let grant = self
            .store
            .try_acquire(key, requester, self.now)
            .map_err(|e| HandlerError::LockStore(e.to_string()))?;
        if grant.acquired {
            self.events.push(Event::LockAcquired {
                key: key.clone(),
                holder: grant.holder,
            });
        }
        Ok(grant.holder)
    }
}
