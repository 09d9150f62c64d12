//! Turning a generation into the message the user sees.

use super::Generation;
use super::tools::ToolMessage;
use crate::slack::Reply;

/// Sent when neither the tools nor the model produced anything.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't find an answer to that.";

/// Pick the reply for a generation.
///
/// The last tool-provided message wins, searching every step and then the
/// final step's results. Plain messages are prefixed with the tool name.
/// Without one, the generated text is used.
#[must_use]
pub fn format_reply(generation: &Generation) -> Reply {
    // Steps in order, then the final results (a copy of the last step); the latest wins.
    let tool_reply = generation
        .steps
        .iter()
        .flat_map(|step| &step.tool_results)
        .chain(&generation.tool_results)
        .filter_map(|result| {
            result
                .message
                .as_ref()
                .map(|message| (result.tool_name.as_str(), message))
        })
        .last();

    match tool_reply {
        Some((tool, ToolMessage::Text(text))) => Reply::Text(format!("[{tool}] {text}")),
        Some((_, ToolMessage::Prompt { text, blocks })) => Reply::Blocks {
            text: text.clone(),
            blocks: blocks.clone(),
        },
        None if !generation.text.trim().is_empty() => Reply::Text(generation.text.clone()),
        None => Reply::Text(FALLBACK_REPLY.to_string()),
    }
}
