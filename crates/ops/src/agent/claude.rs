//! Claude-backed agent with a bounded tool loop.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use tracing::{info, instrument};

use super::tools::{ToolContext, ToolSet};
use super::{Agent, AgentError, GenerateOptions, Generation, GenerationStep};
use crate::claude::{ChatModel, ContentBlock, Message, StopReason};

/// System prompt for the ops assistant.
#[derive(Template)]
#[template(path = "claude/system_prompt.txt")]
struct SystemPromptTemplate;

/// Agent that calls Claude and executes the tools it asks for.
#[derive(Clone)]
pub struct ClaudeAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolSet,
    system_prompt: String,
}

impl ClaudeAgent {
    /// Create an agent.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Prompt` if the system prompt fails to render.
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolSet) -> Result<Self, AgentError> {
        let system_prompt = SystemPromptTemplate
            .render()
            .map_err(|e| AgentError::Prompt(e.to_string()))?;
        Ok(Self {
            model,
            tools,
            system_prompt,
        })
    }
}

impl std::fmt::Debug for ClaudeAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAgent")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for ClaudeAgent {
    #[instrument(skip(self, input), fields(thread_id = %options.thread_id, max_steps = options.max_steps))]
    async fn generate(
        &self,
        input: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, AgentError> {
        let tool_ctx = ToolContext {
            thread_id: options.thread_id.clone(),
            resource_id: options.resource_id.clone(),
        };
        let definitions = ToolSet::definitions();
        let mut messages = vec![Message::user(input)];
        let mut generation = Generation::default();

        for step_number in 1..=options.max_steps.max(1) {
            let response = self
                .model
                .chat(
                    messages.clone(),
                    Some(self.system_prompt.clone()),
                    Some(definitions.clone()),
                )
                .await?;

            info!(
                step = step_number,
                stop_reason = ?response.stop_reason,
                content_blocks = response.content.len(),
                "Claude response received"
            );

            let mut step = GenerationStep::default();
            let mut tool_blocks = Vec::new();

            for block in &response.content {
                match block {
                    ContentBlock::Text { text } => {
                        if !step.text.is_empty() {
                            step.text.push('\n');
                        }
                        step.text.push_str(text);
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        let result = self.tools.execute(name, input, &tool_ctx).await;
                        tool_blocks.push(ContentBlock::ToolResult {
                            tool_use_id: id.clone(),
                            content: result.output.to_string(),
                            is_error: Some(result.is_error),
                        });
                        step.tool_results.push(result);
                    }
                    ContentBlock::ToolResult { .. } => {}
                }
            }

            let wants_tools =
                !tool_blocks.is_empty() && response.stop_reason == Some(StopReason::ToolUse);
            generation.steps.push(step);

            if !wants_tools {
                break;
            }

            messages.push(Message::assistant_blocks(response.content));
            messages.push(Message::tool_results(tool_blocks));
        }

        if let Some(last) = generation.steps.last() {
            generation.text.clone_from(&last.text);
            generation.tool_results.clone_from(&last.tool_results);
        }
        Ok(generation)
    }
}
