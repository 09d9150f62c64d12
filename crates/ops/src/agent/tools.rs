//! Tools offered to the model.

use std::collections::BTreeMap;
use std::sync::Arc;

use ktomg_core::ChainId;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use crate::approval::{ApprovalBridge, PromptContext};
use crate::claude::Tool;
use crate::slack::Block;
use crate::vultr::InstanceDirectory;
use crate::workflow::{Record, RunResult, WorkflowError};
use crate::workflows::{RESTART_VM_WORKFLOW, REVIEW_VM_STEP, restart_message};

/// Lists every VM on the account.
pub const LIST_VMS_TOOL: &str = "list-vms";

/// Starts the approval-gated restart workflow.
pub const RESTART_VM_TOOL: &str = "restart-vm";

/// Who a tool is acting for.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub thread_id: String,
    pub resource_id: String,
}

/// A message a tool wants shown to the user instead of the model's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolMessage {
    Text(String),
    /// An actionable prompt, e.g. an approval button.
    Prompt { text: String, blocks: Vec<Block> },
}

/// Outcome of one tool call.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_name: String,
    /// What the model sees.
    pub output: Value,
    pub message: Option<ToolMessage>,
    pub is_error: bool,
}

impl ToolResult {
    fn error(tool_name: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            tool_name: tool_name.to_string(),
            output: json!({ "error": message }),
            message: None,
            is_error: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestartInput {
    vm_id: String,
    vm_label: String,
}

/// The tool set: instance listing plus the restart workflow.
#[derive(Clone)]
pub struct ToolSet {
    directory: Arc<dyn InstanceDirectory>,
    bridge: ApprovalBridge,
}

impl ToolSet {
    #[must_use]
    pub fn new(directory: Arc<dyn InstanceDirectory>, bridge: ApprovalBridge) -> Self {
        Self { directory, bridge }
    }

    /// Tool definitions sent to the model.
    #[must_use]
    pub fn definitions() -> Vec<Tool> {
        vec![
            Tool {
                name: LIST_VMS_TOOL.to_string(),
                description: "List all virtual machines (VMs) in the account. Returns id, label, power_status (running, stopped), server_status (ok, none, locked, installingbooting), status (active, pending, suspended) and tags.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            Tool {
                name: RESTART_VM_TOOL.to_string(),
                description: "Restart a virtual machine (VM) by ID. The restart waits for a human to approve it in Slack.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "vmId": {
                            "type": "string",
                            "description": "Virtual machine ID"
                        },
                        "vmLabel": {
                            "type": "string",
                            "description": "Virtual machine label"
                        }
                    },
                    "required": ["vmId", "vmLabel"]
                }),
            },
        ]
    }

    /// Execute a tool by name.
    ///
    /// Failures are reported in the result, never raised; the model sees an
    /// error result and can recover.
    #[instrument(skip(self, input, ctx))]
    pub async fn execute(&self, name: &str, input: &Value, ctx: &ToolContext) -> ToolResult {
        match name {
            LIST_VMS_TOOL => self.list_vms().await,
            RESTART_VM_TOOL => match RestartInput::deserialize(input) {
                Ok(input) => self.restart_vm(&input, ctx).await,
                Err(e) => ToolResult::error(name, format!("Invalid input: {e}")),
            },
            _ => {
                warn!(tool = name, "Model requested unknown tool");
                ToolResult::error(name, format!("Unknown tool: {name}"))
            }
        }
    }

    async fn list_vms(&self) -> ToolResult {
        info!("Listing VMs");
        match self.directory.list().await {
            Ok(instances) => ToolResult {
                tool_name: LIST_VMS_TOOL.to_string(),
                output: serde_json::to_value(&instances).unwrap_or_else(|_| json!([])),
                message: None,
                is_error: false,
            },
            Err(e) => {
                error!(error = %e, "Failed to list VMs");
                ToolResult::error(LIST_VMS_TOOL, "Failed to list VMs")
            }
        }
    }

    async fn restart_vm(&self, input: &RestartInput, ctx: &ToolContext) -> ToolResult {
        let engine = self.bridge.engine();
        let chain_id = ChainId::from(RESTART_VM_WORKFLOW);

        if engine.chain(&chain_id).is_err() {
            return restart_reply("Workflow to restart a VM was not found".to_string(), false);
        }

        let trigger: Record = [
            ("vmId".to_string(), Value::String(input.vm_id.clone())),
            ("vmLabel".to_string(), Value::String(input.vm_label.clone())),
        ]
        .into_iter()
        .collect();

        let started = match engine.create_run(&chain_id, trigger).await {
            Ok(run) => {
                info!(run_id = %run.run_id, vm_id = %input.vm_id, "Restart VM workflow started");
                engine.start(&run.run_id).await
            }
            Err(e) => Err(e),
        };

        match started {
            Ok(result) if result.suspended_at(REVIEW_VM_STEP).is_some() => {
                approval_prompt(&result, input, ctx)
            }
            Ok(result) => {
                let restarted = restarted(&result);
                restart_reply(restart_message(&input.vm_id, restarted), restarted)
            }
            Err(e) => {
                log_workflow_error(&e);
                restart_reply(restart_message(&input.vm_id, false), false)
            }
        }
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

fn approval_prompt(
    result: &RunResult,
    input: &RestartInput,
    ctx: &ToolContext,
) -> ToolResult {
    let prompt_ctx = PromptContext {
        thread_id: ctx.thread_id.clone(),
        resource_id: ctx.resource_id.clone(),
        carry: BTreeMap::from([("approvedVmId".to_string(), input.vm_id.clone())]),
    };

    match ApprovalBridge::to_prompt(result, &prompt_ctx) {
        Ok(prompt) => ToolResult {
            tool_name: RESTART_VM_TOOL.to_string(),
            output: json!({
                "message": prompt.text,
                "restarted": false,
                "awaitingApproval": true,
            }),
            message: Some(ToolMessage::Prompt {
                text: prompt.text,
                blocks: prompt.blocks,
            }),
            is_error: false,
        },
        Err(e) => {
            error!(error = %e, run_id = %result.run_id, "Failed to build approval prompt");
            restart_reply(restart_message(&input.vm_id, false), false)
        }
    }
}

fn restarted(result: &RunResult) -> bool {
    result
        .output
        .as_ref()
        .and_then(|output| output.get("restarted"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn restart_reply(message: String, restarted: bool) -> ToolResult {
    ToolResult {
        tool_name: RESTART_VM_TOOL.to_string(),
        output: json!({ "message": message, "restarted": restarted }),
        message: Some(ToolMessage::Text(message)),
        is_error: false,
    }
}

fn log_workflow_error(err: &WorkflowError) {
    match err {
        WorkflowError::Validation { .. } => warn!(error = %err, "Restart VM workflow rejected input"),
        _ => error!(error = %err, "Restart VM workflow failed"),
    }
}
