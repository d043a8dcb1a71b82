// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchdog configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sweep cadence and paging for the watchdog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Time between sweeps, accepts humantime strings like "2s" or "500ms".
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Waiting records fetched per page within a sweep.
    pub page_size: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            page_size: 100,
        }
    }
}

impl WatchdogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}
