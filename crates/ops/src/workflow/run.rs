//! Run state and the results handed back to callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ktomg_core::{ChainId, RunId, RunStatus};
use serde::Serialize;

use super::Record;

/// What happened at one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepRecord {
    Completed { output: Record },
    Suspended { payload: Record },
    Failed { error: String },
}

/// Accumulated data of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    /// Data the run was created with.
    pub trigger_data: Record,
    /// Result of every step that has executed, keyed by step id.
    pub steps: BTreeMap<String, StepRecord>,
    /// Data each step was resumed with, keyed by step id.
    pub resume_data: BTreeMap<String, Record>,
}

impl RunContext {
    /// Completed output of `step_id`, if it has one.
    #[must_use]
    pub fn output(&self, step_id: &str) -> Option<&Record> {
        match self.steps.get(step_id) {
            Some(StepRecord::Completed { output }) => Some(output),
            _ => None,
        }
    }
}

/// A pending request for external input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suspension {
    pub step_id: String,
    pub payload: Record,
}

/// One execution of a chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub run_id: RunId,
    pub chain_id: ChainId,
    pub current_step_index: usize,
    pub context: RunContext,
    pub status: RunStatus,
    /// Set while `status` is `Suspended`.
    pub suspension: Option<Suspension>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    pub(crate) fn new(chain_id: ChainId, trigger_data: Record) -> Self {
        let now = Utc::now();
        Self {
            run_id: RunId::new(),
            chain_id,
            current_step_index: 0,
            context: RunContext {
                trigger_data,
                ..RunContext::default()
            },
            status: RunStatus::Running,
            suspension: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Trigger data the run was created with.
    #[must_use]
    pub const fn trigger_data(&self) -> &Record {
        &self.context.trigger_data
    }

    /// Step the run is parked at, if suspended.
    #[must_use]
    pub fn suspended_step(&self) -> Option<&str> {
        match (&self.status, &self.suspension) {
            (RunStatus::Suspended, Some(suspension)) => Some(&suspension.step_id),
            _ => None,
        }
    }

    /// Whether the run can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Outcome of a `start` or `resume` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: RunId,
    pub chain_id: ChainId,
    pub status: RunStatus,
    /// Per-step results so far.
    pub results: BTreeMap<String, StepRecord>,
    /// Output of the last step when the run completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Record>,
    /// Where and why the run is waiting, when suspended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspended: Option<Suspension>,
}

impl RunResult {
    pub(crate) fn from_state(run: &RunState, last_step: Option<&str>) -> Self {
        let output = match (run.status, last_step) {
            (RunStatus::Completed, Some(step_id)) => run.context.output(step_id).cloned(),
            _ => None,
        };

        Self {
            run_id: run.run_id,
            chain_id: run.chain_id.clone(),
            status: run.status,
            results: run.context.steps.clone(),
            output,
            suspended: run.suspension.clone(),
        }
    }

    /// Whether the run is waiting for external input.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.status == RunStatus::Suspended
    }

    /// Suspend payload if the run is parked at `step_id`.
    #[must_use]
    pub fn suspended_at(&self, step_id: &str) -> Option<&Record> {
        self.suspended
            .as_ref()
            .filter(|suspension| suspension.step_id == step_id)
            .map(|suspension| &suspension.payload)
    }
}
