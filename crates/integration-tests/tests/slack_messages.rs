//! Integration tests for the Slack messages the assistant sends.

use std::sync::Arc;

use ktomg_integration_tests::{FakeDirectory, bridge};
use ktomg_ops::agent::{
    FALLBACK_REPLY, Generation, GenerationStep, RESTART_VM_TOOL, ToolContext, ToolSet,
    format_reply,
};
use ktomg_ops::slack::{Reply, SUGGESTED_PROMPTS_TITLE, suggested_prompts};
use serde_json::json;

async fn restart_generation() -> Generation {
    let directory = Arc::new(FakeDirectory::default());
    let tools = ToolSet::new(directory.clone(), bridge(directory));
    let result = tools
        .execute(
            RESTART_VM_TOOL,
            &json!({"vmId": "abc", "vmLabel": "web-1"}),
            &ToolContext::default(),
        )
        .await;

    Generation {
        text: "I have asked for approval.".to_string(),
        tool_results: Vec::new(),
        steps: vec![GenerationStep {
            text: String::new(),
            tool_results: vec![result],
        }],
    }
}

#[tokio::test]
async fn test_restart_reply_is_an_approval_message() {
    let reply = format_reply(&restart_generation().await);

    let Reply::Blocks { text, blocks } = reply else {
        panic!("expected a block message");
    };
    assert_eq!(
        text,
        "Please confirm if you want to restart the VM with the label: web-1 (ID: abc)."
    );

    let json = serde_json::to_value(&blocks).expect("blocks serialize");
    assert_eq!(json[0]["type"], "section");
    assert_eq!(json[0]["block_id"], "workflow-suspended");
    assert_eq!(json[0]["accessory"]["type"], "button");
    assert_eq!(json[0]["accessory"]["action_id"], "resume-workflow");
    assert_eq!(json[0]["accessory"]["text"]["text"], "Approve");
    assert!(
        json[0]["accessory"]["value"]
            .as_str()
            .is_some_and(|value| value.contains("workflow=restartVmWorkflow"))
    );
    // No requester context line for the default resource
    assert_eq!(blocks.len(), 1);
}

#[test]
fn test_plain_generation_replies_with_text() {
    let reply = format_reply(&Generation {
        text: "There are two VMs.".to_string(),
        ..Generation::default()
    });
    assert_eq!(reply, Reply::Text("There are two VMs.".to_string()));
    assert!(reply.blocks().is_none());
}

#[test]
fn test_empty_generation_falls_back() {
    let reply = format_reply(&Generation::default());
    assert_eq!(reply.text(), FALLBACK_REPLY);
}

#[test]
fn test_suggested_prompts() {
    assert_eq!(SUGGESTED_PROMPTS_TITLE, "Here are some suggested options:");

    let titles = |prompts: Vec<ktomg_ops::slack::SuggestedPrompt>| {
        prompts.into_iter().map(|p| p.title).collect::<Vec<_>>()
    };
    assert_eq!(titles(suggested_prompts(false)), ["Restart DB", "Look up user"]);
    assert_eq!(
        titles(suggested_prompts(true)),
        ["Restart DB", "Look up user", "Summarize channel"]
    );
}
