// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the wait engine

use bittern_core::EventLogError;
use bittern_storage::StoreError;
use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Events(#[from] EventLogError),
    /// The lock store failed mid-sweep; the whole sweep aborts rather than
    /// hand out possibly wrong verdicts.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}
