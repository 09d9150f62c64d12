//! Approval bridge errors.

use ktomg_core::RunId;
use thiserror::Error;

use super::token::TokenError;
use crate::workflow::WorkflowError;

/// Errors from building prompts or resolving tokens.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The token names a chain the engine does not know.
    #[error("unknown workflow {0}")]
    UnknownChain(String),

    /// The run is gone (expired or the process restarted).
    #[error("unknown run {run_id} of workflow {workflow}")]
    UnknownRun { workflow: String, run_id: RunId },

    /// A prompt was requested for a run that is not suspended.
    #[error("run {0} is not suspended")]
    NotSuspended(RunId),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}
