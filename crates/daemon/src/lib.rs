// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon library: lifecycle, wire protocol, and socket server.
//!
//! The `bitternd` binary is a thin wrapper over these modules. They are also
//! exported for clients and black-box tests that speak the socket protocol.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use protocol::{Request, Response, SweepSummary};
