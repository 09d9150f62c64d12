//! Integration tests for the KTOMG ops assistant.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ktomg-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `restart_vm_workflow` - The approval-gated restart chain end to end
//! - `approval_round_trip` - Tool call to button value to resumed run
//! - `slack_messages` - Block Kit output of prompts and replies
//!
//! No external services are needed: the instance directory is either the
//! in-process [`FakeDirectory`] or a `VultrClient` pointed at a wiremock server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ktomg_core::InstanceId;
use ktomg_ops::approval::ApprovalBridge;
use ktomg_ops::vultr::{InstanceDirectory, InstanceRecord, VultrError};
use ktomg_ops::workflow::{Record, WorkflowEngine};
use ktomg_ops::workflows::register_all;
use serde_json::Value;

/// In-memory instance directory that records reboots.
#[derive(Debug, Default)]
pub struct FakeDirectory {
    pub instances: Vec<InstanceRecord>,
    pub fail_reboots: bool,
    reboots: Mutex<Vec<InstanceId>>,
}

impl FakeDirectory {
    #[must_use]
    pub fn with_instances(instances: Vec<InstanceRecord>) -> Self {
        Self {
            instances,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_reboots: true,
            ..Self::default()
        }
    }

    /// Instances a reboot was attempted on, in order.
    #[must_use]
    pub fn reboots(&self) -> Vec<InstanceId> {
        self.reboots
            .lock()
            .map(|reboots| reboots.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InstanceDirectory for FakeDirectory {
    async fn list(&self) -> Result<Vec<InstanceRecord>, VultrError> {
        Ok(self.instances.clone())
    }

    async fn reboot(&self, instance_id: &InstanceId) -> Result<(), VultrError> {
        if let Ok(mut reboots) = self.reboots.lock() {
            reboots.push(instance_id.clone());
        }
        if self.fail_reboots {
            return Err(VultrError::RebootFailed {
                instance_id: instance_id.clone(),
                cause: "500 Internal Server Error".to_string(),
            });
        }
        Ok(())
    }
}

/// A running instance with the given id and label.
#[must_use]
pub fn instance(id: &str, label: &str) -> InstanceRecord {
    InstanceRecord {
        id: InstanceId::from(id),
        label: label.to_string(),
        power_status: "running".to_string(),
        server_status: "ok".to_string(),
        status: "active".to_string(),
        tags: Vec::new(),
    }
}

/// Build a record from a JSON object literal.
///
/// # Panics
///
/// Panics if `value` is not an object.
#[must_use]
pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record must be a JSON object")
}

/// An engine with every production chain registered against `directory`.
///
/// # Panics
///
/// Panics if a chain fails to commit.
#[must_use]
pub fn engine(directory: Arc<dyn InstanceDirectory>) -> WorkflowEngine {
    register_all(WorkflowEngine::builder(), directory)
        .expect("chains should commit")
        .build()
}

/// An approval bridge over [`engine`].
#[must_use]
pub fn bridge(directory: Arc<dyn InstanceDirectory>) -> ApprovalBridge {
    ApprovalBridge::new(engine(directory))
}
