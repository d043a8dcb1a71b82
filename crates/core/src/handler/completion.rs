// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion handler: waits on awaited attempts reaching final statuses

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::condition::{CompleteCondition, WaitCondition, WaitType};
use crate::handler::{ConditionHandler, HandlerContext, HandlerError, Verdict, WaitAction};
use crate::process::ProcessKey;

pub struct CompletionHandler;

impl ConditionHandler for CompletionHandler {
    fn wait_type(&self) -> WaitType {
        WaitType::Completion
    }

    fn process(
        &self,
        process: &ProcessKey,
        condition: &WaitCondition,
        ctx: &mut dyn HandlerContext,
    ) -> Result<Verdict, HandlerError> {
        let WaitCondition::Completion(cond) = condition else {
            return Err(HandlerError::TypeMismatch {
                expected: WaitType::Completion,
                got: condition.wait_type(),
            });
        };

        let done: BTreeSet<Uuid> = cond
            .awaited
            .iter()
            .filter(|id| {
                ctx.status_of(**id)
                    .is_some_and(|status| cond.final_statuses.contains(&status))
            })
            .copied()
            .collect();

        // No progress yet (and an empty awaited set never completes).
        if done.is_empty() {
            return Ok(Verdict::Continue(condition.clone()));
        }

        let satisfied = match cond.complete_condition {
            CompleteCondition::All => done.len() == cond.awaited.len(),
            CompleteCondition::OneOf => true,
        };
        if satisfied {
            return Ok(match &cond.resume_event {
                Some(event) => Verdict::Resume(Some(event.clone())),
                None => Verdict::Action(WaitAction::MarkRunnable { process: *process }),
            });
        }

        // Narrow the awaited set so finished members are never re-queried.
        let mut narrowed = cond.clone();
        narrowed.awaited = cond.awaited.difference(&done).copied().collect();
        Ok(Verdict::Continue(WaitCondition::Completion(narrowed)))
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
