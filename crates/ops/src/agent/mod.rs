//! Tool-using conversational agent.
//!
//! [`ClaudeAgent`] sends the user's text to Claude with the `list-vms` and
//! `restart-vm` tools, executes whatever tools the model asks for, and
//! returns every step's tool results so [`format_reply`] can pick what the
//! user sees.

mod claude;
mod reply;
mod tools;

use async_trait::async_trait;
use thiserror::Error;

use crate::claude::ClaudeError;

pub use claude::ClaudeAgent;
pub use reply::{FALLBACK_REPLY, format_reply};
pub use tools::{LIST_VMS_TOOL, RESTART_VM_TOOL, ToolContext, ToolMessage, ToolResult, ToolSet};

/// Errors from generating a reply.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model error: {0}")]
    Model(#[from] ClaudeError),

    #[error("system prompt could not be rendered: {0}")]
    Prompt(String),
}

/// Conversation identity and limits for one generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Conversation id (the Slack channel).
    pub thread_id: String,
    /// User id, or `default` when unknown.
    pub resource_id: String,
    /// Maximum number of model calls.
    pub max_steps: usize,
}

/// One model call and the tools it triggered.
#[derive(Debug, Clone, Default)]
pub struct GenerationStep {
    pub text: String,
    pub tool_results: Vec<ToolResult>,
}

/// Result of a generation.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// Text of the final step.
    pub text: String,
    /// Tool results of the final step.
    pub tool_results: Vec<ToolResult>,
    /// Every step, in order, including the final one.
    pub steps: Vec<GenerationStep>,
}

/// Something that turns user text into a reply, possibly calling tools.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Generate a reply to `input`.
    async fn generate(
        &self,
        input: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, AgentError>;
}
