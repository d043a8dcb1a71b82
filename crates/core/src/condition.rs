// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wait condition model: what a parked process is waiting for
//!
//! A condition is a value, not a callback. Handlers re-evaluate the stored
//! value on every sweep, so everything a handler needs must live in the
//! condition itself.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::process::ProcessStatus;

/// Statuses that count as "done" for completion conditions unless the
/// condition narrows them.
pub fn default_final_statuses() -> BTreeSet<ProcessStatus> {
    BTreeSet::from([
        ProcessStatus::Finished,
        ProcessStatus::Failed,
        ProcessStatus::Cancelled,
        ProcessStatus::TimedOut,
    ])
}

/// Discriminant of a [`WaitCondition`], used as the handler registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WaitType {
    Completion,
    Lock,
    Sleep,
    None,
}

impl fmt::Display for WaitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Completion => "COMPLETION",
            Self::Lock => "LOCK",
            Self::Sleep => "SLEEP",
            Self::None => "NONE",
        };
        write!(f, "{s}")
    }
}

/// How many awaited members must finish before a completion condition is
/// satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompleteCondition {
    #[default]
    All,
    OneOf,
}

/// Scope of a named lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockScope {
    Project,
    Org,
}

/// The condition a parked process waits on. `None` is an explicit "waits
/// for nothing": records holding it are never armed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitCondition {
    Completion(CompletionCondition),
    Lock(LockCondition),
    Sleep(SleepCondition),
    None,
}

impl WaitCondition {
    pub fn wait_type(&self) -> WaitType {
        match self {
            Self::Completion(_) => WaitType::Completion,
            Self::Lock(_) => WaitType::Lock,
            Self::Sleep(_) => WaitType::Sleep,
            Self::None => WaitType::None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Completion(c) => c.reason.as_deref(),
            Self::Lock(c) => c.reason.as_deref(),
            Self::Sleep(c) => c.reason.as_deref(),
            Self::None => None,
        }
    }

    /// Carried for callers that need it; the engine itself never interprets
    /// this flag.
    pub fn exclusive(&self) -> bool {
        match self {
            Self::Completion(c) => c.exclusive,
            Self::Lock(c) => c.exclusive,
            Self::Sleep(c) => c.exclusive,
            Self::None => false,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Wait until awaited child attempts reach a final status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
    /// Instance ids still being awaited. Handlers narrow this set as
    /// members finish; an empty set never completes.
    pub awaited: BTreeSet<Uuid>,
    #[serde(default = "default_final_statuses")]
    pub final_statuses: BTreeSet<ProcessStatus>,
    #[serde(default)]
    pub complete_condition: CompleteCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_event: Option<String>,
}

impl CompletionCondition {
    pub fn all(awaited: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            reason: None,
            exclusive: false,
            awaited: awaited.into_iter().collect(),
            final_statuses: default_final_statuses(),
            complete_condition: CompleteCondition::All,
            resume_event: None,
        }
    }

    pub fn one_of(awaited: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            complete_condition: CompleteCondition::OneOf,
            ..Self::all(awaited)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_resume_event(mut self, event: impl Into<String>) -> Self {
        self.resume_event = Some(event.into());
        self
    }

    pub fn with_final_statuses(
        mut self,
        statuses: impl IntoIterator<Item = ProcessStatus>,
    ) -> Self {
        self.final_statuses = statuses.into_iter().collect();
        self
    }
}

/// Wait for exclusive ownership of a named lock within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
    /// Instance id asking for the lock.
    pub requester: Uuid,
    pub org_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    pub scope: LockScope,
    pub name: String,
    /// Current owner, filled in by the lock handler while someone else
    /// holds the lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<Uuid>,
}

impl LockCondition {
    pub fn project(requester: Uuid, org_id: Uuid, project_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            reason: None,
            exclusive: false,
            requester,
            org_id,
            project_id: Some(project_id),
            scope: LockScope::Project,
            name: name.into(),
            holder: None,
        }
    }

    pub fn org(requester: Uuid, org_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            reason: None,
            exclusive: false,
            requester,
            org_id,
            project_id: None,
            scope: LockScope::Org,
            name: name.into(),
            holder: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn scope_key(&self) -> ScopeKey {
        ScopeKey {
            org_id: self.org_id,
            project_id: self.project_id,
            scope: self.scope,
            name: self.name.clone(),
        }
    }
}

/// Fully qualified lock identity. Two conditions contend for the same lock
/// exactly when their scope keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub org_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    pub scope: LockScope,
    pub name: String,
}

impl ScopeKey {
    /// Org-scoped locks collapse to the org-wide key regardless of any
    /// project id on the condition.
    pub fn storage_key(&self) -> String {
        match (self.scope, self.project_id) {
            (LockScope::Project, Some(project_id)) => {
                format!("org/{}/project/{}/{}", self.org_id, project_id, self.name)
            }
            _ => format!("org/{}/{}", self.org_id, self.name),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// Wait until a wall-clock deadline passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub exclusive: bool,
    pub until: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_event: Option<String>,
}

impl SleepCondition {
    pub fn until(until: DateTime<Utc>) -> Self {
        Self {
            reason: None,
            exclusive: false,
            until,
            resume_event: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_resume_event(mut self, event: impl Into<String>) -> Self {
        self.resume_event = Some(event.into());
        self
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
