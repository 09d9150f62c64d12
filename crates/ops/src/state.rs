//! Application state shared across handlers.

use std::sync::Arc;

use crate::agent::{ClaudeAgent, ToolSet};
use crate::approval::ApprovalBridge;
use crate::claude::ClaudeClient;
use crate::config::OpsConfig;
use crate::error::AppError;
use crate::services::AssistantService;
use crate::slack::SlackClient;
use crate::vultr::{InstanceDirectory, VultrClient};
use crate::workflow::WorkflowEngine;
use crate::workflows::register_all;

/// Application state shared across all handlers.
///
/// Built once in `main`; cloning shares the same inner state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    slack: SlackClient,
    assistant: AssistantService,
}

impl AppState {
    /// Wire every client, the workflow engine and the agent from config.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be built or a workflow chain
    /// fails validation.
    pub fn new(config: &OpsConfig) -> Result<Self, AppError> {
        let slack = SlackClient::new(
            config.slack.bot_token.clone(),
            config.slack.signing_secret.clone(),
        );
        let claude = ClaudeClient::new(&config.claude)?;
        let directory: Arc<dyn InstanceDirectory> = Arc::new(VultrClient::new(&config.vultr)?);

        let engine = register_all(
            WorkflowEngine::builder().retention(config.run_retention),
            Arc::clone(&directory),
        )?
        .build();
        let bridge = ApprovalBridge::new(engine);

        let agent = ClaudeAgent::new(Arc::new(claude), ToolSet::new(directory, bridge.clone()))?;
        let assistant = AssistantService::new(Arc::new(slack.clone()), Arc::new(agent), bridge);

        Ok(Self::from_parts(slack, assistant))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn from_parts(slack: SlackClient, assistant: AssistantService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { slack, assistant }),
        }
    }

    /// Slack client, used for request verification.
    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.inner.slack
    }

    #[must_use]
    pub fn assistant(&self) -> &AssistantService {
        &self.inner.assistant
    }
}
