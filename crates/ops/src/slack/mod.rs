//! Slack integration for the ops assistant.
//!
//! This module provides:
//! - [`SlackClient`] for posting replies and driving assistant threads
//! - [`ChatPlatform`], the seam the assistant service talks to
//! - Block Kit types for building the approval prompt
//! - Events API and interactivity payload types
//! - Webhook signature verification
//!
//! # Flow
//!
//! 1. Slack delivers an `assistant_thread_started` or `message` event
//! 2. The event handler verifies the signature and acknowledges immediately
//! 3. Replies are posted into the thread, approval prompts carry a button
//! 4. The button click arrives on the interactivity webhook and is answered
//!    through its `response_url`

mod client;
mod error;
mod events;
mod messages;
mod types;

use async_trait::async_trait;

pub use client::SlackClient;
pub use error::SlackError;
pub use events::{
    AssistantThread, AssistantThreadContext, Event, EventEnvelope, MessageEvent,
};
pub use messages::{
    APPROVE_BUTTON_TEXT, SUGGESTED_PROMPTS_TITLE, build_approval_prompt, suggested_prompts,
};
pub use types::{
    Accessory, ApiResponse, Block, ButtonStyle, ContextElement, InteractionAction,
    InteractionChannel, InteractionPayload, InteractionUser, PlainText, PostMessageResponse,
    Reply, SuggestedPrompt, Text,
};

/// Outbound operations the assistant needs from a chat platform.
///
/// Implemented by [`SlackClient`]; tests substitute an in-memory recorder.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Post a reply, threaded under `thread_ts` when given.
    async fn post_reply(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        reply: &Reply,
    ) -> Result<(), SlackError>;

    /// Set the title of an assistant thread.
    async fn set_title(&self, channel: &str, thread_ts: &str, title: &str)
    -> Result<(), SlackError>;

    /// Set the status line shown under an assistant thread.
    async fn set_status(
        &self,
        channel: &str,
        thread_ts: &str,
        status: &str,
    ) -> Result<(), SlackError>;

    /// Offer suggested prompts in an assistant thread.
    async fn set_suggested_prompts(
        &self,
        channel: &str,
        thread_ts: &str,
        title: &str,
        prompts: &[SuggestedPrompt],
    ) -> Result<(), SlackError>;

    /// Answer an interaction through its `response_url`.
    async fn respond(&self, response_url: &str, reply: &Reply) -> Result<(), SlackError>;
}
