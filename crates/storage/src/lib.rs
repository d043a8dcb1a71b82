// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bittern-storage: durable persistence for waiting records.
//!
//! A single JSONL write-ahead log holds every mutation; state is
//! materialized by replaying it on open.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod state;
pub mod store;
pub mod wal;

pub use state::{LockRow, MaterializedState, StatusRow};
pub use store::{CasOutcome, LockGrant, StoreError, WaitStore};
pub use wal::{Wal, WalError};
