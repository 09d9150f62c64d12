//! Slack Block Kit and Web API types.
//!
//! These types represent the subset of Block Kit the assistant emits (a
//! section with an approval button and a context line) plus the Web API
//! request/response shapes and the interactivity payload.
//!
//! See: <https://api.slack.com/block-kit>

use serde::{Deserialize, Serialize};

/// A `chat.postMessage` request body.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessage<'a> {
    /// Channel ID to post to.
    pub channel: &'a str,
    /// Parent message timestamp when replying in a thread.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<&'a str>,
    /// Plain text body, also used as notification fallback for blocks.
    pub text: &'a str,
    /// Message blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<&'a [Block]>,
}

/// What the assistant sends back into a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A plain text message.
    Text(String),
    /// A Block Kit message with its notification fallback text.
    Blocks { text: String, blocks: Vec<Block> },
}

impl Reply {
    /// Text body (or fallback text for block messages).
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Blocks { text, .. } => text,
        }
    }

    /// Blocks, if this is a structured message.
    #[must_use]
    pub fn blocks(&self) -> Option<&[Block]> {
        match self {
            Self::Text(_) => None,
            Self::Blocks { blocks, .. } => Some(blocks),
        }
    }
}

/// Block Kit block types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Section block with text and optional accessory.
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: Text,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    /// Context block with small muted text.
    Context { elements: Vec<ContextElement> },
}

/// Text object types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    /// Plain text (no formatting).
    PlainText { text: String, emoji: bool },
    /// Markdown text (supports formatting).
    Mrkdwn { text: String },
}

impl Text {
    /// Create a plain text object.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    /// Create a markdown text object.
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

/// Plain text object (for button labels).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    pub emoji: bool,
}

impl PlainText {
    /// Create a new plain text object.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: true,
        }
    }
}

/// Context block elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    /// Markdown text in context.
    Mrkdwn { text: String },
}

/// Accessory elements for section blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    /// Button accessory.
    Button {
        text: PlainText,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
}

/// Button style (affects color).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    /// Green primary button.
    Primary,
    /// Red danger button.
    Danger,
}

/// A prompt offered at the top of an assistant thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedPrompt {
    /// Short label shown on the chip.
    pub title: String,
    /// Message sent on the user's behalf when clicked.
    pub message: String,
}

impl SuggestedPrompt {
    /// Create a suggested prompt.
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Channel ID where message was posted.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (unique ID).
    #[serde(default)]
    pub ts: Option<String>,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

/// Generic Web API envelope for calls whose payload we ignore.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// Whether the request was successful.
    pub ok: bool,
    /// Error message if not ok.
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Interactivity
// =============================================================================

/// Slack interaction payload from button clicks.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionPayload {
    /// Type of interaction (`block_actions` for buttons).
    #[serde(rename = "type")]
    pub interaction_type: String,
    /// User who triggered the interaction.
    pub user: InteractionUser,
    /// Channel where interaction occurred.
    #[serde(default)]
    pub channel: Option<InteractionChannel>,
    /// Actions that were triggered.
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
    /// Response URL for answering the interaction.
    #[serde(default)]
    pub response_url: Option<String>,
}

/// User who triggered an interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    /// Slack user ID.
    pub id: String,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
}

/// Channel where interaction occurred.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionChannel {
    /// Channel ID.
    pub id: String,
}

/// Action that was triggered.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    /// Action ID (set when creating the button).
    pub action_id: String,
    /// Block ID containing this action.
    #[serde(default)]
    pub block_id: Option<String>,
    /// Value attached to the action.
    #[serde(default)]
    pub value: Option<String>,
    /// Action type.
    #[serde(rename = "type")]
    pub action_type: String,
}
