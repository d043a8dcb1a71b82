// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition handlers: one evaluator per wait type
//!
//! Handlers never touch the store directly. They observe the world through
//! [`HandlerContext`] and answer with a [`Verdict`]; the sweep owns every
//! write that follows.

mod completion;
mod lock;
mod sleep;

pub use completion::CompletionHandler;
pub use lock::LockHandler;
pub use sleep::SleepHandler;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::condition::{ScopeKey, WaitCondition, WaitType};
use crate::process::{ProcessKey, ProcessStatus};

/// A handler's answer for one waiting record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep waiting on the given condition (possibly rewritten).
    Continue(WaitCondition),
    /// Wake the process, delivering the optional resume event.
    Resume(Option<String>),
    /// Clear the wait and run a follow-up action instead of a direct wake.
    Action(WaitAction),
}

/// Actions a verdict can request besides resuming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitAction {
    MarkRunnable { process: ProcessKey },
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("handler for {expected} given a {got} condition")]
    TypeMismatch { expected: WaitType, got: WaitType },
    #[error("lock store: {0}")]
    LockStore(String),
}

/// What a handler may observe, plus the one mutation it may request,
/// while evaluating conditions.
pub trait HandlerContext {
    fn now(&self) -> DateTime<Utc>;

    /// Latest reported status for an instance, if any.
    fn status_of(&self, instance_id: Uuid) -> Option<ProcessStatus>;

    /// Acquire the lock for `requester` if it is free. Returns the current
    /// holder either way.
    fn try_acquire(&mut self, key: &ScopeKey, requester: Uuid) -> Result<Uuid, HandlerError>;
}

pub trait ConditionHandler: Send + Sync {
    fn wait_type(&self) -> WaitType;

    fn process(
        &self,
        process: &ProcessKey,
        condition: &WaitCondition,
        ctx: &mut dyn HandlerContext,
    ) -> Result<Verdict, HandlerError>;

    /// Evaluate a page worth of same-type records in one call. The default
    /// just loops; handlers override it to share lookups across the page.
    fn process_batch(
        &self,
        batch: &[(ProcessKey, WaitCondition)],
        ctx: &mut dyn HandlerContext,
    ) -> Vec<(ProcessKey, Result<Verdict, HandlerError>)> {
        batch
            .iter()
            .map(|(process, condition)| (*process, self.process(process, condition, ctx)))
            .collect()
    }
}

/// Explicit registry keyed by wait type.
pub struct HandlerRegistry {
    handlers: HashMap<WaitType, Box<dyn ConditionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the three built-in handlers. `NONE` stays
    /// unregistered: records holding it are never armed, so the sweep
    /// never looks it up.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CompletionHandler));
        registry.register(Box::new(LockHandler));
        registry.register(Box::new(SleepHandler));
        registry
    }

    /// Later registrations replace earlier ones for the same type.
    pub fn register(&mut self, handler: Box<dyn ConditionHandler>) {
        self.handlers.insert(handler.wait_type(), handler);
    }

    pub fn get(&self, wait_type: WaitType) -> Option<&dyn ConditionHandler> {
        self.handlers.get(&wait_type).map(Box::as_ref)
    }

    pub fn registered_types(&self) -> Vec<WaitType> {
        let mut types: Vec<WaitType> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
