// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchdog scheduler: periodic sweeps over armed waiting records
//!
//! A sweep pages through armed records in sequence order, evaluates each
//! page's conditions grouped by type, and writes verdicts back through
//! compare-and-set. Audit appends and resume calls run after the store
//! guard is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bittern_core::{
    Clock, Effect, Event, EventLog, HandlerError, HandlerRegistry, ProcessKey, ProcessStatus,
    Verdict, WaitCondition, WaitType, WaitingRecord, WatchdogConfig,
};
use bittern_storage::{CasOutcome, WaitStore};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::context::StoreContext;
use crate::error::EngineError;
use crate::resume::ProcessResumer;

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub visited: usize,
    pub resumed: usize,
    pub enqueued: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failures: usize,
    pub lost_races: usize,
}

impl SweepStats {
    /// True when the sweep did nothing but look.
    pub fn is_quiet(&self) -> bool {
        self.resumed == 0
            && self.enqueued == 0
            && self.updated == 0
            && self.skipped == 0
            && self.failures == 0
            && self.lost_races == 0
    }
}

/// Work that must wait until the store guard is released.
enum Deferred {
    Events(Vec<Event>),
    Resume {
        process: ProcessKey,
        resume_event: Option<String>,
    },
}

pub struct Watchdog<C: Clock> {
    store: Arc<Mutex<WaitStore>>,
    events: Arc<Mutex<EventLog>>,
    registry: HandlerRegistry,
    resumer: Arc<dyn ProcessResumer>,
    clock: C,
    config: WatchdogConfig,
}

impl<C: Clock> Watchdog<C> {
    pub fn new(
        store: Arc<Mutex<WaitStore>>,
        events: Arc<Mutex<EventLog>>,
        registry: HandlerRegistry,
        resumer: Arc<dyn ProcessResumer>,
        clock: C,
        config: WatchdogConfig,
    ) -> Self {
        Self {
            store,
            events,
            registry,
            resumer,
            clock,
            config,
        }
    }

    /// Sweep on the configured interval until shutdown flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => match self.sweep() {
                    Ok(stats) if stats.is_quiet() => {}
                    Ok(stats) => info!(
                        visited = stats.visited,
                        resumed = stats.resumed,
                        enqueued = stats.enqueued,
                        updated = stats.updated,
                        unchanged = stats.unchanged,
                        skipped = stats.skipped,
                        failures = stats.failures,
                        lost_races = stats.lost_races,
                        "sweep finished"
                    ),
                    Err(err) => warn!(error = %err, "sweep aborted"),
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// One full pass over every armed record.
    pub fn sweep(&self) -> Result<SweepStats, EngineError> {
        let started = Instant::now();
        let mut stats = SweepStats::default();
        let mut cursor = 0u64;

        loop {
            let mut deferred = Vec::new();
            {
                let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
                let page = store.page_waiting(cursor, self.config.page_size);
                let Some(last) = page.last() else {
                    break;
                };
                cursor = last.sequence_id;
                self.process_page(&mut store, &page, &mut stats, &mut deferred)?;
            }
            self.execute_deferred(deferred, &mut stats)?;
        }

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sweep complete"
        );
        Ok(stats)
    }

    fn process_page(
        &self,
        store: &mut WaitStore,
        page: &[WaitingRecord],
        stats: &mut SweepStats,
        deferred: &mut Vec<Deferred>,
    ) -> Result<(), EngineError> {
        let now = self.clock.now();

        // Group the page by wait type, keeping first-seen order.
        let mut order: Vec<WaitType> = Vec::new();
        let mut groups: HashMap<WaitType, Vec<&WaitingRecord>> = HashMap::new();
        for record in page {
            let Some(condition) = &record.condition else {
                stats.visited += 1;
                stats.skipped += 1;
                warn!(process = %record.process, "armed record without a condition, skipping");
                continue;
            };
            let wait_type = condition.wait_type();
            if self.registry.get(wait_type).is_none() {
                stats.visited += 1;
                stats.skipped += 1;
                warn!(process = %record.process, %wait_type, "no handler registered, skipping");
                continue;
            }
            let group = groups.entry(wait_type).or_default();
            if group.is_empty() {
                order.push(wait_type);
            }
            group.push(record);
        }

        for wait_type in order {
            let Some(handler) = self.registry.get(wait_type) else {
                continue;
            };
            let group = groups.remove(&wait_type).unwrap_or_default();
            let batch: Vec<(ProcessKey, WaitCondition)> = group
                .iter()
                .filter_map(|r| r.condition.clone().map(|c| (r.process, c)))
                .collect();
            let by_key: HashMap<ProcessKey, &WaitingRecord> =
                group.iter().map(|r| (r.process, *r)).collect();

            let mut ctx = StoreContext::new(store, now);
            let verdicts = handler.process_batch(&batch, &mut ctx);
            let events = ctx.into_events();
            if !events.is_empty() {
                deferred.push(Deferred::Events(events));
            }

            for (process, verdict) in verdicts {
                stats.visited += 1;
                let Some(record) = by_key.get(&process) else {
                    continue;
                };
                match verdict {
                    Ok(verdict) => {
                        self.apply_verdict(store, record, &verdict, now, stats, deferred)?;
                    }
                    Err(HandlerError::LockStore(message)) => {
                        return Err(EngineError::StoreUnavailable(message));
                    }
                    Err(err) => {
                        stats.failures += 1;
                        warn!(process = %process, error = %err, "handler failed for record");
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_verdict(
        &self,
        store: &mut WaitStore,
        record: &WaitingRecord,
        verdict: &Verdict,
        now: DateTime<Utc>,
        stats: &mut SweepStats,
        deferred: &mut Vec<Deferred>,
    ) -> Result<(), EngineError> {
        let (next, effects) = record.apply_verdict(verdict, &self.clock);
        if next == *record {
            stats.unchanged += 1;
            return Ok(());
        }
        if store.cas_record(next, record.version, now)? == CasOutcome::Lost {
            stats.lost_races += 1;
            debug!(process = %record.process, "record changed underneath, skipping");
            return Ok(());
        }
        if matches!(verdict, Verdict::Continue(_)) {
            stats.updated += 1;
        }

        let mut events = Vec::new();
        let mut resumes = Vec::new();
        for effect in effects {
            match effect {
                Effect::Emit(event) => events.push(event),
                Effect::Resume {
                    process,
                    resume_event,
                } => {
                    resumes.push(Deferred::Resume {
                        process,
                        resume_event,
                    });
                }
                Effect::MarkRunnable { process } => {
                    store.upsert_status(process, ProcessStatus::Enqueued, now)?;
                    events.push(Event::ProcessEnqueued { process });
                    stats.enqueued += 1;
                }
            }
        }
        if !events.is_empty() {
            deferred.push(Deferred::Events(events));
        }
        deferred.extend(resumes);
        Ok(())
    }

    fn execute_deferred(
        &self,
        deferred: Vec<Deferred>,
        stats: &mut SweepStats,
    ) -> Result<(), EngineError> {
        for item in deferred {
            match item {
                Deferred::Events(events) => {
                    let mut log = self.events.lock().unwrap_or_else(|e| e.into_inner());
                    log.append_all(events, self.clock.now())?;
                }
                Deferred::Resume {
                    process,
                    resume_event,
                } => match self.resumer.resume(&process, resume_event.as_deref()) {
                    Ok(()) => {
                        stats.resumed += 1;
                        info!(process = %process, resume_event = ?resume_event, "process resumed");
                        let mut log = self.events.lock().unwrap_or_else(|e| e.into_inner());
                        log.append(
                            Event::ProcessResumed {
                                process,
                                resume_event,
                            },
                            self.clock.now(),
                        )?;
                    }
                    Err(err) => {
                        stats.failures += 1;
                        error!(process = %process, error = %err, "resume failed; record already cleared");
                    }
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
