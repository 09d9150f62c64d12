//! Approval-gated workflow engine.
//!
//! A workflow is a linear [`Chain`] of [`Step`]s. The [`WorkflowEngine`]
//! creates runs, executes steps in order and, when a step returns
//! [`Outcome::Suspended`], parks the run in the [`RunStore`] until some later
//! task calls [`WorkflowEngine::resume`] with the data the step asked for.
//!
//! # Flow
//!
//! 1. `create_run` validates trigger data and stores a `Running` run
//! 2. `start` drives steps until one suspends or the chain ends
//! 3. A suspended run waits in the store (bounded by the retention TTL)
//! 4. `resume` claims the run under its lock, re-executes the suspended step
//!    with the resume data and continues from there
//!
//! Steps never run twice for the same run unless they suspended.

mod chain;
mod contract;
mod engine;
mod error;
mod run;
mod step;
mod store;

use serde_json::{Map, Value};

pub use chain::{Bindings, Chain, ChainBuilder, ChainStep, VariableSource};
pub use contract::{Contract, ContractViolation, FieldKind, FieldSpec};
pub use engine::{WorkflowEngine, WorkflowEngineBuilder};
pub use error::{ChainError, WorkflowError};
pub use run::{RunContext, RunResult, RunState, StepRecord, Suspension};
pub use step::{Outcome, Step, StepContext, StepError};
pub use store::RunStore;

/// A JSON object: trigger data, step inputs/outputs and suspend payloads.
pub type Record = Map<String, Value>;

/// Resolve a dotted path (`a.b.c`) inside a record.
#[must_use]
pub fn lookup_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = record.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
