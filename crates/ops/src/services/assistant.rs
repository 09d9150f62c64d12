//! Assistant conversation handling.
//!
//! Each entry point runs on its own task after the webhook has been
//! acknowledged, so failures are logged and turned into a short apology in
//! the conversation rather than returned.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::agent::{Agent, GenerateOptions, format_reply};
use crate::approval::{ApprovalBridge, ApprovalError};
use crate::slack::{
    AssistantThread, ChatPlatform, MessageEvent, Reply, SUGGESTED_PROMPTS_TITLE, suggested_prompts,
};
use crate::workflow::WorkflowError;

/// First message in a new assistant thread.
pub const GREETING: &str = "Hi, how can I help?";

/// Posted when handling a user message fails.
pub const SOMETHING_WENT_WRONG: &str = "Sorry, something went wrong!";

/// Reply to an approval click that carries no token.
pub const SKIP_WORKFLOW: &str = "Looks like I can skip the workflow.";

/// Prefix of the prompt asking the agent to explain a resumed run.
pub const INTERPRET_PREFIX: &str =
    "Interpret the results of this workflow step and provide a response to the user: ";

const TYPING_STATUS: &str = "is typing...";
const DEFAULT_RESOURCE: &str = "default";
const MESSAGE_MAX_STEPS: usize = 3;
const INTERPRET_MAX_STEPS: usize = 1;

/// Drives assistant threads: greeting, agent replies and approvals.
#[derive(Clone)]
pub struct AssistantService {
    chat: Arc<dyn ChatPlatform>,
    agent: Arc<dyn Agent>,
    bridge: ApprovalBridge,
}

impl AssistantService {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatPlatform>, agent: Arc<dyn Agent>, bridge: ApprovalBridge) -> Self {
        Self {
            chat,
            agent,
            bridge,
        }
    }

    /// Greet a freshly opened thread and offer suggested prompts.
    #[instrument(skip(self, thread), fields(channel = %thread.channel_id, thread_ts = %thread.thread_ts))]
    pub async fn thread_started(&self, thread: &AssistantThread) {
        let greeting = Reply::Text(GREETING.to_string());
        if let Err(e) = self
            .chat
            .post_reply(&thread.channel_id, Some(&thread.thread_ts), &greeting)
            .await
        {
            error!(error = %e, "Failed to greet assistant thread");
            return;
        }

        let prompts = suggested_prompts(thread.context.channel_id.is_some());
        if let Err(e) = self
            .chat
            .set_suggested_prompts(
                &thread.channel_id,
                &thread.thread_ts,
                SUGGESTED_PROMPTS_TITLE,
                &prompts,
            )
            .await
        {
            error!(error = %e, "Failed to set suggested prompts");
        }
    }

    /// Answer a user message in an assistant thread.
    ///
    /// Messages outside a thread, without text, or not from a user are
    /// ignored.
    #[instrument(skip(self, message), fields(channel = %message.channel))]
    pub async fn user_message(&self, message: &MessageEvent) {
        let (Some(thread_ts), Some(text)) = (
            message.thread_ts.as_deref(),
            message.text.as_deref().filter(|text| !text.is_empty()),
        ) else {
            return;
        };
        if !message.is_from_user() {
            return;
        }

        if let Err(e) = self.chat.set_title(&message.channel, thread_ts, text).await {
            warn!(error = %e, "Failed to set thread title");
        }
        if let Err(e) = self
            .chat
            .set_status(&message.channel, thread_ts, TYPING_STATUS)
            .await
        {
            warn!(error = %e, "Failed to set thread status");
        }

        let options = GenerateOptions {
            thread_id: message.channel.clone(),
            resource_id: message
                .user
                .clone()
                .unwrap_or_else(|| DEFAULT_RESOURCE.to_string()),
            max_steps: MESSAGE_MAX_STEPS,
        };

        let reply = match self.agent.generate(text, &options).await {
            Ok(generation) => format_reply(&generation),
            Err(e) => {
                error!(error = %e, "Agent failed to answer message");
                Reply::Text(SOMETHING_WENT_WRONG.to_string())
            }
        };

        if let Err(e) = self
            .chat
            .post_reply(&message.channel, Some(thread_ts), &reply)
            .await
        {
            error!(error = %e, "Failed to post reply");
        }
    }

    /// Handle a click on the approval button.
    ///
    /// `value` is the button value (the encoded resumption token).
    #[instrument(skip(self, value, response_url))]
    pub async fn approval_clicked(&self, value: Option<&str>, response_url: &str) {
        let reply = self.resume_and_interpret(value).await;
        if let Err(e) = self.chat.respond(response_url, &reply).await {
            error!(error = %e, "Failed to answer approval click");
        }
    }

    async fn resume_and_interpret(&self, value: Option<&str>) -> Reply {
        let Some(raw) = value.filter(|raw| !raw.is_empty()) else {
            return Reply::Text(SKIP_WORKFLOW.to_string());
        };

        let request = match self.bridge.from_token(raw).await {
            Ok(request) => request,
            Err(e) => return Reply::Text(approval_failure(&e)),
        };

        info!(
            run_id = %request.run_id,
            workflow = %request.chain_id,
            step_id = %request.step_id,
            "Resuming workflow from approval"
        );

        let result = match self.bridge.resume(&request).await {
            Ok(result) => result,
            Err(e) => return Reply::Text(approval_failure(&e)),
        };

        let summary = match serde_json::to_string(&result) {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Failed to serialize run result");
                return Reply::Text(SOMETHING_WENT_WRONG.to_string());
            }
        };

        let options = GenerateOptions {
            thread_id: request.thread_id,
            resource_id: request.resource_id,
            max_steps: INTERPRET_MAX_STEPS,
        };
        match self
            .agent
            .generate(&format!("{INTERPRET_PREFIX}{summary}"), &options)
            .await
        {
            Ok(generation) => format_reply(&generation),
            Err(e) => {
                error!(error = %e, "Agent failed to interpret workflow result");
                Reply::Text(SOMETHING_WENT_WRONG.to_string())
            }
        }
    }
}

impl std::fmt::Debug for AssistantService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantService")
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

/// User-facing text for an approval that could not be resumed.
fn approval_failure(err: &ApprovalError) -> String {
    match err {
        ApprovalError::UnknownChain(workflow) => {
            warn!(workflow, "Approval for unknown workflow");
            format!("Looks like the workflow [{workflow}] doesn't exist.")
        }
        ApprovalError::UnknownRun { workflow, run_id } => {
            warn!(workflow, %run_id, "Approval for unknown run");
            format!("Looks like the workflow [{workflow}] run [{run_id}] doesn't exist.")
        }
        ApprovalError::Workflow(WorkflowError::InvalidResumeTarget { .. }) => {
            warn!(error = %err, "Approval for a run that is no longer waiting");
            "Looks like this request was already handled.".to_string()
        }
        ApprovalError::Token(_) => {
            warn!(error = %err, "Approval with malformed token");
            "Sorry, I couldn't read that approval request.".to_string()
        }
        ApprovalError::NotSuspended(_) | ApprovalError::Workflow(_) => {
            error!(error = %err, "Approval could not be resumed");
            SOMETHING_WENT_WRONG.to_string()
        }
    }
}
