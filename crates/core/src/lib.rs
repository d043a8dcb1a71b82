//! bittern-core: the wait-condition model.
//!
//! This crate provides:
//! - The condition sum type and the waiting-record state machine
//! - Condition handlers and their registry
//! - The audit event vocabulary and the append-only event log
//! - The operation vocabulary the storage layer persists

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod config;

// Model (order matters for dependencies)
pub mod process;
pub mod condition;
pub mod effect;
pub mod handler;
pub mod record;
pub mod operation;
pub mod events;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::WatchdogConfig;
pub use effect::{Effect, Event};
pub use events::{EventLog, EventLogError, EventRecord};
pub use operation::Operation;
pub use process::{ProcessKey, ProcessStatus};
pub use record::WaitingRecord;

// Re-export the condition model
pub use condition::{
    default_final_statuses, CompleteCondition, CompletionCondition, LockCondition, LockScope,
    ScopeKey, SleepCondition, WaitCondition, WaitType,
};

// Re-export handlers
pub use handler::{
    CompletionHandler, ConditionHandler, HandlerContext, HandlerError, HandlerRegistry,
    LockHandler, SleepHandler, Verdict, WaitAction,
};
