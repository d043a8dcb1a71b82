// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sleep handler: waits for a wall-clock deadline

use crate::condition::{WaitCondition, WaitType};
use crate::handler::{ConditionHandler, HandlerContext, HandlerError, Verdict};
use crate::process::ProcessKey;

pub struct SleepHandler;

impl ConditionHandler for SleepHandler {
    fn wait_type(&self) -> WaitType {
        WaitType::Sleep
    }

    fn process(
        &self,
        _process: &ProcessKey,
        condition: &WaitCondition,
        ctx: &mut dyn HandlerContext,
    ) -> Result<Verdict, HandlerError> {
        let WaitCondition::Sleep(cond) = condition else {
            return Err(HandlerError::TypeMismatch {
                expected: WaitType::Sleep,
                got: condition.wait_type(),
            });
        };
        // The deadline itself counts as due.
        if ctx.now() >= cond.until {
            Ok(Verdict::Resume(cond.resume_event.clone()))
        } else {
            Ok(Verdict::Continue(condition.clone()))
        }
    }
}

#[cfg(test)]
#[path = "sleep_tests.rs"]
mod tests;
