//! Prompt building and token resolution.

use std::collections::BTreeMap;

use ktomg_core::{ChainId, RunId};
use serde_json::Value;
use tracing::{debug, instrument};

use super::error::ApprovalError;
use super::token::ResumptionToken;
use crate::slack::{Block, build_approval_prompt};
use crate::workflow::{Record, RunResult, WorkflowEngine, WorkflowError};

/// Block id of the approval section.
pub const APPROVAL_BLOCK_ID: &str = "workflow-suspended";

/// Action id of the approval button.
pub const RESUME_ACTION_ID: &str = "resume-workflow";

const DEFAULT_PROMPT_TEXT: &str = "A workflow is waiting for your approval.";

/// Who asked, and what to carry into the resume.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Conversation the reply belongs to (the Slack channel).
    pub thread_id: String,
    /// User the conversation belongs to.
    pub resource_id: String,
    /// Context fields handed to the suspended step on resume.
    pub carry: BTreeMap<String, String>,
}

/// A Slack-ready approval prompt.
#[derive(Debug, Clone)]
pub struct ActionablePrompt {
    /// Human-readable text, also the notification fallback.
    pub text: String,
    pub token: ResumptionToken,
    /// `token`, encoded; the button value.
    pub encoded: String,
    pub blocks: Vec<Block>,
}

/// A decoded token whose chain and run were found.
#[derive(Debug, Clone)]
pub struct ResumeRequest {
    pub run_id: RunId,
    pub chain_id: ChainId,
    pub step_id: String,
    pub thread_id: String,
    pub resource_id: String,
    /// Resume data for the suspended step.
    pub context_overrides: Record,
}

/// Bridges suspended runs and Slack button clicks.
#[derive(Debug, Clone)]
pub struct ApprovalBridge {
    engine: WorkflowEngine,
}

impl ApprovalBridge {
    #[must_use]
    pub const fn new(engine: WorkflowEngine) -> Self {
        Self { engine }
    }

    #[must_use]
    pub const fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    /// Build the approval prompt for a suspended run.
    ///
    /// The text is the suspend payload's `message`.
    ///
    /// # Errors
    ///
    /// Returns `NotSuspended` if the run is not waiting, or a token error if
    /// the carried context cannot be encoded.
    pub fn to_prompt(
        run: &RunResult,
        ctx: &PromptContext,
    ) -> Result<ActionablePrompt, ApprovalError> {
        let suspension = run
            .suspended
            .as_ref()
            .filter(|_| run.is_suspended())
            .ok_or(ApprovalError::NotSuspended(run.run_id))?;

        let text = suspension
            .payload
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or(DEFAULT_PROMPT_TEXT)
            .to_string();

        let token = ResumptionToken {
            run_id: run.run_id,
            workflow: run.chain_id.clone(),
            step_id: suspension.step_id.clone(),
            thread_id: ctx.thread_id.clone(),
            resource_id: ctx.resource_id.clone(),
            context: ctx.carry.clone(),
        };
        let encoded = token.encode()?;

        let blocks = build_approval_prompt(
            APPROVAL_BLOCK_ID,
            RESUME_ACTION_ID,
            &text,
            &encoded,
            Some(ctx.resource_id.as_str()),
        );

        Ok(ActionablePrompt {
            text,
            token,
            encoded,
            blocks,
        })
    }

    /// Decode a button value and check the run it names still exists.
    ///
    /// # Errors
    ///
    /// Returns a token error for an undecodable value, `UnknownChain` if the
    /// workflow is not registered and `UnknownRun` if the run is gone or
    /// belongs to another workflow.
    #[allow(clippy::wrong_self_convention)]
    #[instrument(skip(self, raw))]
    pub async fn from_token(&self, raw: &str) -> Result<ResumeRequest, ApprovalError> {
        let token = ResumptionToken::decode(raw)?;

        self.engine
            .chain(&token.workflow)
            .map_err(|_| ApprovalError::UnknownChain(token.workflow.to_string()))?;

        let unknown_run = || ApprovalError::UnknownRun {
            workflow: token.workflow.to_string(),
            run_id: token.run_id,
        };
        let run = match self.engine.run(&token.run_id).await {
            Ok(run) => run,
            Err(WorkflowError::UnknownRun(_)) => return Err(unknown_run()),
            Err(e) => return Err(e.into()),
        };
        if run.chain_id != token.workflow {
            return Err(unknown_run());
        }

        debug!(run_id = %token.run_id, step_id = %token.step_id, "Resolved resumption token");

        let context_overrides = token
            .context
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        Ok(ResumeRequest {
            run_id: token.run_id,
            chain_id: token.workflow,
            step_id: token.step_id,
            thread_id: token.thread_id,
            resource_id: token.resource_id,
            context_overrides,
        })
    }

    /// Resume the run a request names.
    ///
    /// # Errors
    ///
    /// Propagates engine errors, notably `InvalidResumeTarget` for a run that
    /// was already resumed.
    pub async fn resume(&self, request: &ResumeRequest) -> Result<RunResult, ApprovalError> {
        let result = self
            .engine
            .resume(
                &request.run_id,
                &request.step_id,
                request.context_overrides.clone(),
            )
            .await?;
        Ok(result)
    }
}
