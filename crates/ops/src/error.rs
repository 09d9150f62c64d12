//! Unified error handling for the ops server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::agent::AgentError;
use crate::claude::ClaudeError;
use crate::config::ConfigError;
use crate::slack::SlackError;
use crate::vultr::VultrError;
use crate::workflow::ChainError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Slack error: {0}")]
    Slack(#[from] SlackError),

    #[error("Claude error: {0}")]
    Claude(#[from] ClaudeError),

    #[error("Vultr error: {0}")]
    Vultr(#[from] VultrError),

    /// A built-in workflow chain failed validation.
    #[error("Workflow error: {0}")]
    Chain(#[from] ChainError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Request signature missing or invalid.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Slack(_) | Self::Claude(_) | Self::Vultr(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Chain(_) | Self::Agent(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::warn!(error = %self, "Rejected request");
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Unauthorized(_) | Self::BadRequest(_) => self.to_string(),
            Self::Slack(_) | Self::Claude(_) | Self::Vultr(_) => {
                "External service error".to_string()
            }
            _ => "Internal server error".to_string(),
        };

        (status, message).into_response()
    }
}
