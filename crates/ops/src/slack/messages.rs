//! Slack message builders for the assistant.
//!
//! Provides factory functions for building:
//! - The approval prompt attached to a suspended workflow run
//! - Suggested prompts offered when an assistant thread opens

use super::types::{Accessory, Block, ButtonStyle, ContextElement, PlainText, SuggestedPrompt, Text};

/// Label of the approval button.
pub const APPROVE_BUTTON_TEXT: &str = "Approve";

/// Title shown above the suggested prompts.
pub const SUGGESTED_PROMPTS_TITLE: &str = "Here are some suggested options:";

/// Build the approval prompt for a suspended run.
///
/// The message is a single section carrying `text` with an "Approve" button
/// accessory, plus a context line naming the requester when known. The button
/// value is the encoded resumption token, returned verbatim by Slack when the
/// button is clicked.
#[must_use]
pub fn build_approval_prompt(
    block_id: &str,
    action_id: &str,
    text: &str,
    token_value: &str,
    requested_by: Option<&str>,
) -> Vec<Block> {
    let mut blocks = vec![Block::Section {
        block_id: Some(block_id.to_string()),
        text: Text::mrkdwn(text),
        accessory: Some(Accessory::Button {
            text: PlainText::new(APPROVE_BUTTON_TEXT),
            action_id: action_id.to_string(),
            value: Some(token_value.to_string()),
            style: Some(ButtonStyle::Primary),
        }),
    }];

    if let Some(user) = requested_by.filter(|user| !user.is_empty() && *user != "default") {
        blocks.push(Block::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: format!("Requested by <@{user}>"),
            }],
        });
    }

    blocks
}

/// Suggested prompts for a freshly opened assistant thread.
///
/// Threads opened while viewing a channel also get a channel summary prompt.
#[must_use]
pub fn suggested_prompts(opened_in_channel: bool) -> Vec<SuggestedPrompt> {
    let mut prompts = vec![
        SuggestedPrompt::new("Restart DB", "Reboot the database server."),
        SuggestedPrompt::new("Look up user", "Look up the user `username` in the database"),
    ];

    if opened_in_channel {
        prompts.push(SuggestedPrompt::new(
            "Summarize channel",
            "Assistant, please summarize the activity in this channel!",
        ));
    }

    prompts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_prompt_structure() {
        let blocks = build_approval_prompt(
            "workflow-suspended",
            "resume-workflow",
            "Please confirm",
            "runId=abc&stepId=review-vm",
            Some("U123"),
        );

        assert_eq!(blocks.len(), 2);
        let json = serde_json::to_value(&blocks).unwrap();
        assert_eq!(json[0]["type"], "section");
        assert_eq!(json[0]["block_id"], "workflow-suspended");
        assert_eq!(json[0]["text"]["type"], "mrkdwn");
        assert_eq!(json[0]["text"]["text"], "Please confirm");
        assert_eq!(json[0]["accessory"]["type"], "button");
        assert_eq!(json[0]["accessory"]["text"]["text"], "Approve");
        assert_eq!(json[0]["accessory"]["action_id"], "resume-workflow");
        assert_eq!(json[0]["accessory"]["value"], "runId=abc&stepId=review-vm");
        assert_eq!(json[0]["accessory"]["style"], "primary");
        assert_eq!(json[1]["type"], "context");
        assert!(
            json[1]["elements"][0]["text"]
                .as_str()
                .unwrap()
                .contains("<@U123>")
        );
    }

    #[test]
    fn test_approval_prompt_without_known_requester() {
        for requester in [None, Some(""), Some("default")] {
            let blocks = build_approval_prompt("b", "a", "text", "token", requester);
            assert_eq!(blocks.len(), 1);
        }
    }

    #[test]
    fn test_suggested_prompts_channel_aware() {
        let prompts = suggested_prompts(false);
        let titles: Vec<_> = prompts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Restart DB", "Look up user"]);

        let prompts = suggested_prompts(true);
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[2].title, "Summarize channel");
    }
}
