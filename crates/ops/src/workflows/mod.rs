//! Workflow chains registered by the assistant.

pub mod restart_vm;

use std::sync::Arc;

use crate::vultr::InstanceDirectory;
use crate::workflow::{ChainError, WorkflowEngineBuilder};

pub use restart_vm::{
    RESTART_VM_STEP, RESTART_VM_WORKFLOW, REVIEW_VM_STEP, restart_message, restart_vm_chain,
};

/// Register every chain the assistant knows about.
///
/// # Errors
///
/// Returns `ChainError` if a chain fails validation.
pub fn register_all(
    builder: WorkflowEngineBuilder,
    directory: Arc<dyn InstanceDirectory>,
) -> Result<WorkflowEngineBuilder, ChainError> {
    Ok(builder.register(restart_vm_chain(directory)?))
}
