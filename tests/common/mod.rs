// tests/common/mod.rs
//! Common helpers for cadchat integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cadchat_lib::bus::EventBus;
use cadchat_lib::config::ChatConfig;
use cadchat_lib::document::{demo_registry, InMemoryPartHistory};
use cadchat_lib::model::{AssistantMessage, ChatModelClient, ChatRequest, ModelError, ToolCall};
use cadchat_lib::runtime::{CredentialPrompt, Orchestrator};

/// Replays canned assistant messages in order and keeps the requests.
#[derive(Clone, Default)]
pub struct CannedModel {
    replies: Arc<Mutex<VecDeque<AssistantMessage>>>,
    pub requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl CannedModel {
    pub fn new(replies: Vec<AssistantMessage>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }
}

impl ChatModelClient for CannedModel {
    fn model_id(&self) -> String {
        "canned-model".to_string()
    }

    async fn create_chat_completion(
        &self,
        _api_key: &str,
        request: &ChatRequest,
    ) -> Result<AssistantMessage, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ModelError::Request("no canned reply left".to_string()))
    }
}

/// Prompt that always answers with the same key.
pub struct FixedPrompt(pub Option<&'static str>);

#[async_trait]
impl CredentialPrompt for FixedPrompt {
    async fn request_secret(&self, _current: Option<&str>) -> Option<String> {
        self.0.map(str::to_string)
    }
}

pub fn config(api_key: Option<&str>) -> ChatConfig {
    ChatConfig {
        api_key: api_key.map(str::to_string),
        screenshot_after_mutation: false,
        ..ChatConfig::default()
    }
}

pub fn session<M: ChatModelClient>(model: M, api_key: Option<&str>) -> Orchestrator<M, InMemoryPartHistory> {
    Orchestrator::new(
        config(api_key),
        model,
        InMemoryPartHistory::new(demo_registry()),
        Box::new(FixedPrompt(None)),
        Arc::new(EventBus::new()),
    )
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> AssistantMessage {
    AssistantMessage::with_tool_calls(vec![ToolCall::new(id, name, arguments.to_string())])
}
