// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock handler: grants a named lock to one requester at a time

use std::collections::HashMap;

use uuid::Uuid;

use crate::condition::{LockCondition, WaitCondition, WaitType};
use crate::handler::{ConditionHandler, HandlerContext, HandlerError, Verdict};
use crate::process::ProcessKey;

pub struct LockHandler;

/// The winner resumes with the lock name as its resume event; everyone
/// else keeps waiting with the current holder written onto the condition.
fn verdict_for(cond: &LockCondition, holder: Uuid) -> Verdict {
    if holder == cond.requester {
        Verdict::Resume(Some(cond.name.clone()))
    } else {
        let mut waiting = cond.clone();
        waiting.holder = Some(holder);
        Verdict::Continue(WaitCondition::Lock(waiting))
    }
}

impl ConditionHandler for LockHandler {
    fn wait_type(&self) -> WaitType {
        WaitType::Lock
    }

    fn process(
        &self,
        _process: &ProcessKey,
        condition: &WaitCondition,
        ctx: &mut dyn HandlerContext,
    ) -> Result<Verdict, HandlerError> {
        let WaitCondition::Lock(cond) = condition else {
            return Err(HandlerError::TypeMismatch {
                expected: WaitType::Lock,
                got: condition.wait_type(),
            });
        };
        let holder = ctx.try_acquire(&cond.scope_key(), cond.requester)?;
        Ok(verdict_for(cond, holder))
    }

    /// One acquire per distinct lock per page. Contenders for the same key
    /// all see the same holder, so exactly one of them wins.
    fn process_batch(
        &self,
        batch: &[(ProcessKey, WaitCondition)],
        ctx: &mut dyn HandlerContext,
    ) -> Vec<(ProcessKey, Result<Verdict, HandlerError>)> {
        let mut holders: HashMap<String, Uuid> = HashMap::new();
        let mut out = Vec::with_capacity(batch.len());
        for (process, condition) in batch {
            let WaitCondition::Lock(cond) = condition else {
                out.push((
                    *process,
                    Err(HandlerError::TypeMismatch {
                        expected: WaitType::Lock,
                        got: condition.wait_type(),
                    }),
                ));
                continue;
            };
            let key = cond.scope_key();
            let storage_key = key.storage_key();
            let holder = match holders.get(&storage_key) {
                Some(holder) => *holder,
                None => match ctx.try_acquire(&key, cond.requester) {
                    Ok(holder) => {
                        holders.insert(storage_key, holder);
                        holder
                    }
                    Err(err) => {
                        out.push((*process, Err(err)));
                        continue;
                    }
                },
            };
            out.push((*process, Ok(verdict_for(cond, holder))));
        }
        out
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
