//! Workflow engine error types.

use ktomg_core::{RunId, RunStatus};
use thiserror::Error;

/// Errors raised while building a chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// A chain needs at least one step.
    #[error("chain {0} has no steps")]
    Empty(String),

    /// Two steps share an id.
    #[error("duplicate step id {0}")]
    DuplicateStep(String),

    /// A binding names a step that is not in the chain.
    #[error("step {step} binds `{target}` to unknown step {source_step}")]
    UnknownSource {
        step: String,
        target: String,
        source_step: String,
    },

    /// A binding names the same or a later step.
    #[error("step {step} binds `{target}` to step {source_step}, which does not run before it")]
    ForwardReference {
        step: String,
        target: String,
        source_step: String,
    },

    /// A binding names a field the source does not declare.
    #[error("step {step} binds `{target}` to undeclared field `{field}` of {source_name}")]
    UnknownField {
        step: String,
        target: String,
        source_name: String,
        field: String,
    },

    /// A binding targets a field the step does not declare as input.
    #[error("step {step} has a binding for undeclared input `{target}`")]
    UnknownTarget { step: String, target: String },
}

/// Errors surfaced by [`WorkflowEngine`](super::WorkflowEngine) operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No chain is registered under this id.
    #[error("unknown workflow chain {0}")]
    UnknownChain(String),

    /// The run does not exist or its retention expired.
    #[error("unknown or expired workflow run {0}")]
    UnknownRun(RunId),

    /// Data failed a declared contract; the run did not advance.
    #[error("invalid input for {target}: {reason}")]
    Validation { target: String, reason: String },

    /// Resume was called on a run that is not suspended at that step.
    #[error("run {run_id} cannot be resumed at step {step_id}: {reason}")]
    InvalidResumeTarget {
        run_id: RunId,
        step_id: String,
        reason: String,
    },

    /// Start was called on a run that has already executed.
    #[error("run {run_id} has already started (status {status})")]
    AlreadyStarted { run_id: RunId, status: RunStatus },

    /// A step failed; the run is now `Failed`.
    #[error("step {step_id} failed in run {run_id}: {message}")]
    StepExecution {
        run_id: RunId,
        step_id: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_error_display() {
        let err = WorkflowError::UnknownChain("restartVmWorkflow".to_string());
        assert_eq!(err.to_string(), "unknown workflow chain restartVmWorkflow");

        let err = WorkflowError::Validation {
            target: "step restart-vm".to_string(),
            reason: "field `vmId` is required".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid input for step restart-vm: field `vmId` is required"
        );
    }

    #[test]
    fn test_chain_error_display() {
        let err = ChainError::ForwardReference {
            step: "a".to_string(),
            target: "x".to_string(),
            source_step: "b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "step a binds `x` to step b, which does not run before it"
        );
    }
}
