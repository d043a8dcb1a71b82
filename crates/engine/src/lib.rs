// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Bittern wait engine: lifecycle listener and watchdog scheduler

mod context;
mod error;
mod lifecycle;
mod resume;
mod watchdog;

pub use error::EngineError;
pub use lifecycle::LifecycleListener;
pub use resume::{EnqueueResumer, ProcessResumer, RecordingResumer, ResumeError};
pub use watchdog::{SweepStats, Watchdog};
