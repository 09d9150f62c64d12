//! Restart a VM after a human approves it.
//!
//! `review-vm` suspends with a confirmation message until it is resumed with
//! `approvedVmId`; `restart-vm` then reboots the approved instance.

use std::sync::Arc;

use async_trait::async_trait;
use ktomg_core::InstanceId;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::vultr::InstanceDirectory;
use crate::workflow::{
    Bindings, Chain, ChainError, Contract, FieldKind, Outcome, Record, Step, StepContext,
    StepError, VariableSource,
};

/// Chain id of the restart workflow.
pub const RESTART_VM_WORKFLOW: &str = "restartVmWorkflow";

/// Step that asks for approval.
pub const REVIEW_VM_STEP: &str = "review-vm";

/// Step that reboots the instance.
pub const RESTART_VM_STEP: &str = "restart-vm";

fn object(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// What the user is told about a restart attempt.
#[must_use]
pub fn restart_message(vm_id: &str, restarted: bool) -> String {
    let vm_id = if vm_id.is_empty() { "(blank)" } else { vm_id };
    if restarted {
        format!("VM with ID {vm_id} restarted successfully.")
    } else {
        format!("Failed to restart VM with ID {vm_id}.")
    }
}

/// Suspends until a human approves the VM.
pub struct ReviewVm {
    input: Contract,
    output: Contract,
}

impl ReviewVm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            input: Contract::new().optional(
                "approvedVmId",
                FieldKind::String,
                "Approved virtual machine ID",
            ),
            output: Contract::new().required(
                "finalVmId",
                FieldKind::String,
                "The final approved virtual machine ID",
            ),
        }
    }
}

impl Default for ReviewVm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Step for ReviewVm {
    fn id(&self) -> &str {
        REVIEW_VM_STEP
    }

    fn input_contract(&self) -> &Contract {
        &self.input
    }

    fn output_contract(&self) -> &Contract {
        &self.output
    }

    async fn execute(&self, ctx: &StepContext) -> Result<Outcome, StepError> {
        if let Some(approved) = ctx.resume_str("approvedVmId") {
            return Ok(Outcome::Completed(object(json!({ "finalVmId": approved }))));
        }

        let vm_id = ctx.trigger_str("vmId").unwrap_or_default();
        let vm_label = ctx.trigger_str("vmLabel").unwrap_or_default();
        Ok(Outcome::Suspended(object(json!({
            "vmId": vm_id,
            "message": format!(
                "Please confirm if you want to restart the VM with the label: {vm_label} (ID: {vm_id})."
            ),
        }))))
    }
}

/// Reboots the approved instance.
///
/// A failed reboot is reported as `restarted: false` with a failure message
/// rather than failing the run, so the user gets a reply either way.
pub struct RestartVm {
    directory: Arc<dyn InstanceDirectory>,
    input: Contract,
    output: Contract,
}

impl RestartVm {
    #[must_use]
    pub fn new(directory: Arc<dyn InstanceDirectory>) -> Self {
        Self {
            directory,
            input: Contract::new().required("vmId", FieldKind::String, "Virtual machine ID"),
            output: Contract::new()
                .required("message", FieldKind::String, "Outcome to show the user")
                .required("restarted", FieldKind::Bool, "Whether the reboot was accepted"),
        }
    }
}

#[async_trait]
impl Step for RestartVm {
    fn id(&self) -> &str {
        RESTART_VM_STEP
    }

    fn input_contract(&self) -> &Contract {
        &self.input
    }

    fn output_contract(&self) -> &Contract {
        &self.output
    }

    async fn execute(&self, ctx: &StepContext) -> Result<Outcome, StepError> {
        let vm_id = ctx
            .input_str("vmId")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StepError::new("VM ID is required to restart the VM."))?;

        info!(vm_id, "Restarting VM");
        let restarted = match self.directory.reboot(&InstanceId::new(vm_id)).await {
            Ok(()) => true,
            Err(e) => {
                error!(vm_id, error = %e, "VM reboot failed");
                false
            }
        };

        Ok(Outcome::Completed(object(json!({
            "message": restart_message(vm_id, restarted),
            "restarted": restarted,
        }))))
    }
}

/// Build the `restartVmWorkflow` chain: `review-vm` then `restart-vm`.
///
/// # Errors
///
/// Returns `ChainError` if the chain fails validation.
pub fn restart_vm_chain(directory: Arc<dyn InstanceDirectory>) -> Result<Chain, ChainError> {
    let trigger = Contract::new()
        .required("vmId", FieldKind::String, "Virtual machine ID")
        .required("vmLabel", FieldKind::String, "Virtual machine label");

    Chain::builder(RESTART_VM_WORKFLOW, trigger)
        .step(ReviewVm::new())
        .then(
            RestartVm::new(directory),
            Bindings::from([(
                "vmId".to_string(),
                VariableSource::step(REVIEW_VM_STEP, "finalVmId"),
            )]),
        )
        .commit()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ktomg_core::{ChainId, RunStatus};

    use super::*;
    use crate::vultr::{InstanceRecord, VultrError};
    use crate::workflow::WorkflowEngine;

    #[derive(Default)]
    struct FakeDirectory {
        fail: bool,
        reboots: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InstanceDirectory for FakeDirectory {
        async fn list(&self) -> Result<Vec<InstanceRecord>, VultrError> {
            Ok(Vec::new())
        }

        async fn reboot(&self, instance_id: &InstanceId) -> Result<(), VultrError> {
            self.reboots
                .lock()
                .expect("lock")
                .push(instance_id.to_string());
            if self.fail {
                Err(VultrError::RebootFailed {
                    instance_id: instance_id.clone(),
                    cause: "503".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn engine(directory: Arc<FakeDirectory>) -> WorkflowEngine {
        let chain = restart_vm_chain(directory).expect("chain");
        WorkflowEngine::builder().register(chain).build()
    }

    fn trigger() -> Record {
        object(json!({"vmId": "abc", "vmLabel": "web-1"}))
    }

    #[tokio::test]
    async fn test_review_suspends_with_confirmation() {
        let directory = Arc::new(FakeDirectory::default());
        let engine = engine(Arc::clone(&directory));

        let run = engine
            .create_run(&ChainId::from(RESTART_VM_WORKFLOW), trigger())
            .await
            .expect("create");
        let result = engine.start(&run.run_id).await.expect("start");

        assert_eq!(result.status, RunStatus::Suspended);
        let payload = result.suspended_at(REVIEW_VM_STEP).expect("suspended");
        assert_eq!(payload["vmId"], "abc");
        assert_eq!(
            payload["message"],
            "Please confirm if you want to restart the VM with the label: web-1 (ID: abc)."
        );
        assert!(directory.reboots.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_approval_reboots_approved_vm() {
        let directory = Arc::new(FakeDirectory::default());
        let engine = engine(Arc::clone(&directory));

        let run = engine
            .create_run(&ChainId::from(RESTART_VM_WORKFLOW), trigger())
            .await
            .expect("create");
        engine.start(&run.run_id).await.expect("start");
        let result = engine
            .resume(&run.run_id, REVIEW_VM_STEP, object(json!({"approvedVmId": "abc"})))
            .await
            .expect("resume");

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(
            result.output,
            Some(object(json!({
                "message": "VM with ID abc restarted successfully.",
                "restarted": true,
            })))
        );
        assert_eq!(*directory.reboots.lock().expect("lock"), ["abc"]);
    }

    #[tokio::test]
    async fn test_failed_reboot_completes_with_false() {
        let directory = Arc::new(FakeDirectory {
            fail: true,
            ..FakeDirectory::default()
        });
        let engine = engine(Arc::clone(&directory));

        let run = engine
            .create_run(&ChainId::from(RESTART_VM_WORKFLOW), trigger())
            .await
            .expect("create");
        engine.start(&run.run_id).await.expect("start");
        let result = engine
            .resume(&run.run_id, REVIEW_VM_STEP, object(json!({"approvedVmId": "abc"})))
            .await
            .expect("resume");

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(
            result.output,
            Some(object(json!({
                "message": "Failed to restart VM with ID abc.",
                "restarted": false,
            })))
        );
    }

    #[test]
    fn test_restart_message() {
        assert_eq!(restart_message("abc", true), "VM with ID abc restarted successfully.");
        assert_eq!(restart_message("abc", false), "Failed to restart VM with ID abc.");
        assert_eq!(restart_message("", false), "Failed to restart VM with ID (blank).");
    }

    #[tokio::test]
    async fn test_trigger_requires_label() {
        let engine = engine(Arc::new(FakeDirectory::default()));
        let err = engine
            .create_run(
                &ChainId::from(RESTART_VM_WORKFLOW),
                object(json!({"vmId": "abc"})),
            )
            .await
            .expect_err("missing label");
        assert!(err.to_string().contains("vmLabel"));
    }
}
