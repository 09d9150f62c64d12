//! In-process fakes of the trait seams, shared by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ktomg_core::InstanceId;

use crate::agent::{Agent, AgentError, GenerateOptions, Generation};
use crate::approval::ApprovalBridge;
use crate::services::AssistantService;
use crate::slack::{ChatPlatform, Reply, SlackError, SuggestedPrompt};
use crate::vultr::{InstanceDirectory, InstanceRecord, VultrError};
use crate::workflow::WorkflowEngine;
use crate::workflows::register_all;

/// Something the assistant sent to the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply {
        channel: String,
        thread_ts: Option<String>,
        reply: Reply,
    },
    Title(String),
    Status(String),
    Prompts {
        title: String,
        count: usize,
    },
    Respond {
        url: String,
        reply: Reply,
    },
}

/// Records every outbound call.
#[derive(Default)]
pub struct RecordingChat {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingChat {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("lock").clone()
    }

    fn push(&self, sent: Sent) -> Result<(), SlackError> {
        self.sent.lock().expect("lock").push(sent);
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for RecordingChat {
    async fn post_reply(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        reply: &Reply,
    ) -> Result<(), SlackError> {
        self.push(Sent::Reply {
            channel: channel.to_string(),
            thread_ts: thread_ts.map(str::to_string),
            reply: reply.clone(),
        })
    }

    async fn set_title(
        &self,
        _channel: &str,
        _thread_ts: &str,
        title: &str,
    ) -> Result<(), SlackError> {
        self.push(Sent::Title(title.to_string()))
    }

    async fn set_status(
        &self,
        _channel: &str,
        _thread_ts: &str,
        status: &str,
    ) -> Result<(), SlackError> {
        self.push(Sent::Status(status.to_string()))
    }

    async fn set_suggested_prompts(
        &self,
        _channel: &str,
        _thread_ts: &str,
        title: &str,
        prompts: &[SuggestedPrompt],
    ) -> Result<(), SlackError> {
        self.push(Sent::Prompts {
            title: title.to_string(),
            count: prompts.len(),
        })
    }

    async fn respond(&self, response_url: &str, reply: &Reply) -> Result<(), SlackError> {
        self.push(Sent::Respond {
            url: response_url.to_string(),
            reply: reply.clone(),
        })
    }
}

/// Echoes its input back as text, or fails.
#[derive(Default)]
pub struct EchoAgent {
    pub fail: bool,
    pub calls: Mutex<Vec<(String, GenerateOptions)>>,
}

#[async_trait]
impl Agent for EchoAgent {
    async fn generate(
        &self,
        input: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, AgentError> {
        self.calls
            .lock()
            .expect("lock")
            .push((input.to_string(), options.clone()));
        if self.fail {
            return Err(AgentError::Prompt("boom".to_string()));
        }
        Ok(Generation {
            text: format!("echo: {input}"),
            ..Generation::default()
        })
    }
}

/// Directory with no instances whose reboots always succeed.
pub struct NoopDirectory;

#[async_trait]
impl InstanceDirectory for NoopDirectory {
    async fn list(&self) -> Result<Vec<InstanceRecord>, VultrError> {
        Ok(Vec::new())
    }

    async fn reboot(&self, _instance_id: &InstanceId) -> Result<(), VultrError> {
        Ok(())
    }
}

/// An assistant service wired to fakes.
pub struct Harness {
    pub chat: Arc<RecordingChat>,
    pub agent: Arc<EchoAgent>,
    pub service: AssistantService,
}

impl Harness {
    pub fn new(agent: EchoAgent) -> Self {
        let engine = register_all(WorkflowEngine::builder(), Arc::new(NoopDirectory))
            .expect("chains")
            .build();
        let bridge = ApprovalBridge::new(engine);
        let chat = Arc::new(RecordingChat::default());
        let agent = Arc::new(agent);
        let service = AssistantService::new(chat.clone(), agent.clone(), bridge);
        Self {
            chat,
            agent,
            service,
        }
    }
}
