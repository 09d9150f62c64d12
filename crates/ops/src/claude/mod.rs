//! Claude API integration backing the conversational agent.
//!
//! # Features
//!
//! - Non-streaming Messages API access with tool use
//! - Typed error mapping for rate limits, auth failures and API errors
//! - [`ChatModel`] seam so the agent loop can run against a scripted model

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::ClaudeClient;
pub use error::ClaudeError;
pub use types::{
    ChatRequest, ChatResponse, ContentBlock, Message, MessageContent, Role, StopReason, Tool,
    Usage,
};

/// A language model that can answer a conversation, optionally calling tools.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and return the model's next turn.
    async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponse, ClaudeError>;
}

#[async_trait]
impl ChatModel for ClaudeClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponse, ClaudeError> {
        Self::chat(self, messages, system, tools).await
    }
}
