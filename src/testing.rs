//! Shared test doubles for the orchestrator and tool tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::bus::{BusEvent, EventBus};
use crate::config::ChatConfig;
use crate::document::{demo_registry, InMemoryPartHistory};
use crate::model::{AssistantMessage, ChatModelClient, ChatRequest, ModelError, ToolCall};
use crate::runtime::{CredentialPrompt, Orchestrator};

pub(crate) const TEST_API_KEY: &str = "sk-test";

type Reply = Result<AssistantMessage, ModelError>;

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
    api_keys: Mutex<Vec<String>>,
}

/// Model double that replays queued replies and records every request.
/// Clones share the same script.
#[derive(Clone)]
pub(crate) struct ScriptedModel {
    model_id: String,
    script: Arc<Script>,
}

impl ScriptedModel {
    pub(crate) fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            script: Arc::new(Script::default()),
        }
    }

    pub(crate) fn then(self, reply: Reply) -> Self {
        self.script.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Reply used whenever the queue is empty.
    pub(crate) fn repeating(self, reply: Reply) -> Self {
        *self.script.fallback.lock().unwrap() = Some(reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.script.requests.lock().unwrap().clone()
    }

    pub(crate) fn api_keys(&self) -> Vec<String> {
        self.script.api_keys.lock().unwrap().clone()
    }
}

impl ChatModelClient for ScriptedModel {
    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn create_chat_completion(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<AssistantMessage, ModelError> {
        self.script.requests.lock().unwrap().push(request.clone());
        self.script.api_keys.lock().unwrap().push(api_key.to_string());
        let next = self.script.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .script
                .fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(ModelError::Request("script exhausted".to_string()))),
        }
    }
}

/// Credential prompt that hands out queued answers and counts calls.
#[derive(Clone, Default)]
pub(crate) struct RecordingPrompt {
    answers: Arc<Mutex<VecDeque<Option<String>>>>,
    calls: Arc<AtomicUsize>,
}

impl RecordingPrompt {
    pub(crate) fn answering(answers: &[Option<&str>]) -> Self {
        let prompt = Self::default();
        prompt
            .answers
            .lock()
            .unwrap()
            .extend(answers.iter().map(|a| a.map(str::to_string)));
        prompt
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialPrompt for RecordingPrompt {
    async fn request_secret(&self, _current: Option<&str>) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers.lock().unwrap().pop_front().flatten()
    }
}

pub(crate) fn test_config(api_key: Option<&str>) -> ChatConfig {
    ChatConfig {
        api_key: api_key.map(str::to_string),
        screenshot_after_mutation: false,
        ..ChatConfig::default()
    }
}

pub(crate) fn orchestrator(
    model: ScriptedModel,
    prompt: RecordingPrompt,
) -> Orchestrator<ScriptedModel, InMemoryPartHistory> {
    orchestrator_with(
        test_config(Some(TEST_API_KEY)),
        model,
        InMemoryPartHistory::new(demo_registry()),
        prompt,
    )
}

pub(crate) fn orchestrator_with(
    config: ChatConfig,
    model: ScriptedModel,
    history: InMemoryPartHistory,
    prompt: RecordingPrompt,
) -> Orchestrator<ScriptedModel, InMemoryPartHistory> {
    Orchestrator::new(
        config,
        model,
        history,
        Box::new(prompt),
        Arc::new(EventBus::new()),
    )
}

pub(crate) fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, arguments.to_string())
}

pub(crate) fn tool_calls(calls: Vec<ToolCall>) -> Reply {
    Ok(AssistantMessage::with_tool_calls(calls))
}

pub(crate) fn text(reply: &str) -> Reply {
    Ok(AssistantMessage::text(reply))
}

pub(crate) fn generation_error(fragment: Option<&str>) -> Reply {
    Err(ModelError::ToolCallGeneration {
        message: "Failed to call a function. Please adjust your prompt.".to_string(),
        failed_generation: fragment.map(str::to_string),
    })
}

/// Everything published so far, without waiting.
pub(crate) fn drain(rx: &mut broadcast::Receiver<BusEvent>) -> Vec<BusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
