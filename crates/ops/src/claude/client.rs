//! Claude API client for chat interactions.
//!
//! Non-streaming access to the Anthropic Messages API, which is all the
//! agent's tool loop needs: each turn is processed whole before continuing.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use crate::config::ClaudeConfig;

use super::error::{ApiErrorResponse, ClaudeError};
use super::types::{ChatRequest, ChatResponse, Message, Tool};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Claude API client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    model: String,
    api_url: String,
}

impl std::fmt::Debug for ClaudeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeClient")
            .field("model", &self.inner.model)
            .field("api_url", &self.inner.api_url)
            .finish_non_exhaustive()
    }
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key contains invalid header characters
    /// or the HTTP client cannot be built.
    pub fn new(config: &ClaudeConfig) -> Result<Self, ClaudeError> {
        Self::with_api_url(config, ANTHROPIC_API_URL)
    }

    /// Create a client that talks to a different Messages endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`ClaudeClient::new`].
    pub fn with_api_url(config: &ClaudeConfig, api_url: &str) -> Result<Self, ClaudeError> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| ClaudeError::Config(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-api-key", api_key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClaudeError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                model: config.model.clone(),
                api_url: api_url.to_string(),
            }),
        })
    }

    /// Model name requests are sent with.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Send a chat request and get a complete response.
    ///
    /// # Arguments
    ///
    /// * `messages` - Conversation history
    /// * `system` - Optional system prompt
    /// * `tools` - Optional list of available tools
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, messages, system, tools), fields(model = %self.inner.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponse, ClaudeError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages,
            system,
            tools,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.api_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_status(status, response).await);
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ClaudeError::Parse(format!("Failed to parse response: {e}")))?;

        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            stop_reason = ?parsed.stop_reason,
            "Claude response received"
        );

        Ok(parsed)
    }

    /// Map an error status code to a typed error.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ClaudeError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ClaudeError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ClaudeError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => serde_json::from_str::<ApiErrorResponse>(&body).map_or_else(
                |_| ClaudeError::Api {
                    error_type: "unknown".to_string(),
                    message: body.clone(),
                },
                |api_error| ClaudeError::Api {
                    error_type: api_error.error.error_type,
                    message: api_error.error.message,
                },
            ),
            Err(e) => ClaudeError::Http(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config() -> ClaudeConfig {
        ClaudeConfig {
            api_key: SecretString::from("sk-ant-test-key".to_string()),
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }

    fn client_for(server: &MockServer) -> ClaudeClient {
        ClaudeClient::with_api_url(&test_config(), &format!("{}/v1/messages", server.uri()))
            .expect("client should build")
    }

    #[test]
    fn test_claude_client_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync>() {}
        assert_traits::<ClaudeClient>();
    }

    #[test]
    fn test_debug_omits_api_key() {
        let client = ClaudeClient::new(&test_config()).expect("client should build");
        assert!(!format!("{client:?}").contains("sk-ant-test-key"));
    }

    #[tokio::test]
    async fn test_chat_sends_model_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-sonnet-4-20250514",
                "system": "be brief"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "model": "claude-sonnet-4-20250514",
                "stop_reason": "end_turn",
                "content": [{"type": "text", "text": "Hello"}],
                "usage": {"input_tokens": 3, "output_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client
            .chat(vec![Message::user("hi")], Some("be brief".to_string()), None)
            .await
            .expect("chat should succeed");

        assert_eq!(response.id, "msg_1");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .chat(vec![Message::user("hi")], None, None)
            .await
            .expect_err("should be rate limited");
        assert!(matches!(err, ClaudeError::RateLimited(12)));
    }

    #[tokio::test]
    async fn test_api_error_body_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "bad tools"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .chat(vec![Message::user("hi")], None, None)
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            ClaudeError::Api { error_type, message }
                if error_type == "invalid_request_error" && message == "bad tools"
        ));
    }
}
