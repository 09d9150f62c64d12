//! Slack Web API client.
//!
//! Provides methods for posting threaded replies, driving assistant thread
//! chrome (title, status, suggested prompts), answering interactions and
//! verifying webhook signatures.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, error, instrument};

use super::ChatPlatform;
use super::error::SlackError;
use super::types::{ApiResponse, Block, PostMessage, PostMessageResponse, Reply, SuggestedPrompt};

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Maximum accepted age of a signed request, in seconds.
const SIGNATURE_MAX_AGE_SECS: u64 = 300;

const SIGNATURE_VERSION_TAG: &str = "v0";
const SIGNATURE_VERSION: &str = "v0=";

/// Slack API client for the assistant.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    bot_token: SecretString,
    signing_secret: SecretString,
    api_base: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    #[must_use]
    pub fn new(bot_token: SecretString, signing_secret: SecretString) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            signing_secret,
            api_base: SLACK_API_BASE.to_string(),
        }
    }

    /// Point the client at a different Web API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Post a message, optionally threaded.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Slack returns an error.
    #[instrument(skip(self, text, blocks), fields(channel = %channel))]
    pub async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
        blocks: Option<&[Block]>,
    ) -> Result<PostMessageResponse, SlackError> {
        let message = PostMessage {
            channel,
            thread_ts,
            text,
            blocks,
        };

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&message)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(
                error = ?result.error,
                "Slack API error posting message"
            );
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(
            ts = ?result.ts,
            channel = ?result.channel,
            "Message posted to Slack"
        );

        Ok(result)
    }

    /// Call a Web API method whose response carries nothing but `ok`/`error`.
    async fn call<T: Serialize + Sync>(&self, method: &str, body: &T) -> Result<(), SlackError> {
        let response = self
            .client
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: ApiResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(method, error = ?result.error, "Slack API error");
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        debug!(method, "Slack API call succeeded");
        Ok(())
    }

    /// Respond to a `response_url` (for interaction responses).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, response_url, reply))]
    pub async fn respond_to_url(
        &self,
        response_url: &str,
        reply: &Reply,
        replace_original: bool,
    ) -> Result<(), SlackError> {
        #[derive(Serialize)]
        struct ResponseMessage<'a> {
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            blocks: Option<&'a [Block]>,
            replace_original: bool,
        }

        let message = ResponseMessage {
            text: reply.text(),
            blocks: reply.blocks(),
            replace_original,
        };

        let response = self
            .client
            .post(response_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Response(format!(
                "Response URL returned {status}: {body}"
            )));
        }

        debug!("Responded to Slack response_url");

        Ok(())
    }

    /// Check `X-Slack-Signature` against the body, rejecting requests older
    /// than five minutes.
    ///
    /// See <https://api.slack.com/authentication/verifying-requests-from-slack>.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` for a stale or unparseable timestamp, a
    /// signature without the `v0=` hex form, or a mismatch.
    pub fn verify_signature(
        &self,
        timestamp: &str,
        body: &str,
        signature: &str,
    ) -> Result<(), SlackError> {
        let sent_at: i64 = timestamp
            .parse()
            .map_err(|_| SlackError::InvalidSignature(format!("bad timestamp {timestamp:?}")))?;
        let age = chrono::Utc::now().timestamp().abs_diff(sent_at);
        if age > SIGNATURE_MAX_AGE_SECS {
            return Err(SlackError::InvalidSignature(format!(
                "request is {age}s old"
            )));
        }

        let digest = signature
            .strip_prefix(SIGNATURE_VERSION)
            .and_then(|hex_digest| hex::decode(hex_digest).ok())
            .ok_or_else(|| SlackError::InvalidSignature("not a v0 signature".to_string()))?;

        // verify_slice compares in constant time
        self.keyed_mac(timestamp, body)?
            .verify_slice(&digest)
            .map_err(|_| SlackError::InvalidSignature("signature mismatch".to_string()))
    }

    /// The `v0=` signature Slack would send for `body` at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns error if the signing secret cannot key the HMAC.
    pub fn sign(&self, timestamp: &str, body: &str) -> Result<String, SlackError> {
        let digest = self.keyed_mac(timestamp, body)?.finalize().into_bytes();
        Ok(format!("{SIGNATURE_VERSION}{}", hex::encode(digest)))
    }

    fn keyed_mac(&self, timestamp: &str, body: &str) -> Result<Hmac<Sha256>, SlackError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.signing_secret.expose_secret().as_bytes())
            .map_err(|e| SlackError::InvalidSignature(e.to_string()))?;
        mac.update(format!("{SIGNATURE_VERSION_TAG}:{timestamp}:").as_bytes());
        mac.update(body.as_bytes());
        Ok(mac)
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn post_reply(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        reply: &Reply,
    ) -> Result<(), SlackError> {
        self.post_message(channel, thread_ts, reply.text(), reply.blocks())
            .await
            .map(|_| ())
    }

    async fn set_title(
        &self,
        channel: &str,
        thread_ts: &str,
        title: &str,
    ) -> Result<(), SlackError> {
        #[derive(Serialize)]
        struct SetTitle<'a> {
            channel_id: &'a str,
            thread_ts: &'a str,
            title: &'a str,
        }

        self.call(
            "assistant.threads.setTitle",
            &SetTitle {
                channel_id: channel,
                thread_ts,
                title,
            },
        )
        .await
    }

    async fn set_status(
        &self,
        channel: &str,
        thread_ts: &str,
        status: &str,
    ) -> Result<(), SlackError> {
        #[derive(Serialize)]
        struct SetStatus<'a> {
            channel_id: &'a str,
            thread_ts: &'a str,
            status: &'a str,
        }

        self.call(
            "assistant.threads.setStatus",
            &SetStatus {
                channel_id: channel,
                thread_ts,
                status,
            },
        )
        .await
    }

    async fn set_suggested_prompts(
        &self,
        channel: &str,
        thread_ts: &str,
        title: &str,
        prompts: &[SuggestedPrompt],
    ) -> Result<(), SlackError> {
        #[derive(Serialize)]
        struct SetSuggestedPrompts<'a> {
            channel_id: &'a str,
            thread_ts: &'a str,
            title: &'a str,
            prompts: &'a [SuggestedPrompt],
        }

        self.call(
            "assistant.threads.setSuggestedPrompts",
            &SetSuggestedPrompts {
                channel_id: channel,
                thread_ts,
                title,
                prompts,
            },
        )
        .await
    }

    async fn respond(&self, response_url: &str, reply: &Reply) -> Result<(), SlackError> {
        self.respond_to_url(response_url, reply, false).await
    }
}
