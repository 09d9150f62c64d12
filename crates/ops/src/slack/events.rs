//! Slack Events API payloads.
//!
//! Only the envelope kinds and event types the assistant reacts to are
//! modelled; everything else deserializes into a catch-all variant and is
//! acknowledged without further work.
//!
//! See: <https://api.slack.com/apis/events-api>

use serde::Deserialize;

/// Outer envelope of an Events API request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Sent once when the request URL is configured.
    UrlVerification { challenge: String },
    /// A subscribed event.
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: Event,
    },
    /// Rate limit notices, app uninstalls and other envelopes.
    #[serde(other)]
    Other,
}

/// Inner event of an `event_callback` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A user opened the assistant container.
    AssistantThreadStarted { assistant_thread: AssistantThread },
    /// A message was posted.
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

/// The assistant thread a user just opened.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantThread {
    /// User who opened the thread.
    pub user_id: String,
    /// DM channel hosting the thread.
    pub channel_id: String,
    /// Thread root timestamp.
    pub thread_ts: String,
    /// Where the user was when they opened the assistant.
    #[serde(default)]
    pub context: AssistantThreadContext,
}

/// Context an assistant thread was opened from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantThreadContext {
    /// Channel the user was viewing, if any.
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// A `message` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    /// Channel the message was posted in.
    pub channel: String,
    /// Author. Absent on some system messages.
    #[serde(default)]
    pub user: Option<String>,
    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
    /// Message timestamp.
    #[serde(default)]
    pub ts: Option<String>,
    /// Parent thread timestamp for threaded messages.
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Set for edits, joins, bot messages and similar.
    #[serde(default)]
    pub subtype: Option<String>,
    /// Set when a bot (including this one) posted the message.
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl MessageEvent {
    /// Whether this is a plain message authored by a human.
    #[must_use]
    pub const fn is_from_user(&self) -> bool {
        self.subtype.is_none() && self.bot_id.is_none()
    }
}
