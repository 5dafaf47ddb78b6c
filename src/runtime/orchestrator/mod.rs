//! Tool-calling conversation orchestrator.
//!
//! One [`Orchestrator`] drives one chat session against one part history:
//! - Appends the user's message and makes sure a credential is cached
//! - Frames each request (system prompt, part-history snapshot, history)
//! - Executes requested tool calls strictly in order
//! - Sends follow-up requests until the model stops calling tools
//! - Applies the depth ceiling, the compact-toolset retry and auth handling
//!
//! # Sub-modules
//!
//! - `request`: Request framing, orphan detection, debug summaries
//! - `dispatch`: Single tool-call execution and failure reporting
//!
//! A turn is an explicit state machine rather than recursion, so the
//! follow-up ceiling is a loop bound:
//!
//! ```text
//! BuildingRequest -> AwaitingModel -> ExecutingTools -> BuildingFollowup -> AwaitingModel -> ...
//!                                \-> Terminal
//! ```

use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::bus::event_types::{
    CATEGORY_AGENT, CATEGORY_CONVERSATION, EVENT_AGENT_NOTICE, EVENT_CONVERSATION_RESET,
    EVENT_MESSAGE_APPENDED, EVENT_MESSAGE_DELETED, EVENT_ORPHAN_TOOL_MESSAGES,
};
use crate::bus::{BusEvent, EventBus};
use crate::config::ChatConfig;
use crate::conversation::{MessageStore, Projection, Role};
use crate::core::tool::ToolDescriptor;
use crate::document::PartHistory;
use crate::model::{
    AssistantMessage, ChatModelClient, ChatRequest, ImageCapability, ModelError,
    NameHintCapabilities,
};
use crate::tools::{SelectionMode, ToolCatalog, ToolContext};

use super::credentials::{CredentialCache, CredentialPrompt};

mod dispatch;
pub mod request;

use request::{find_orphan_tool_messages, preview_text, summarize_messages, ToolBatch};

/// Follow-up requests allowed per user turn.
pub const MAX_FOLLOWUP_ROUNDS: usize = 8;

pub const AUTH_FAILED_TEXT: &str = "Authentication failed (401). Set API Key and try again.";
pub const GENERIC_FAILURE_TEXT: &str = "Sorry, there was an error processing your request.";
pub const DEPTH_LIMIT_TEXT: &str = "Stopping tool loop after reaching safety depth limit.";
pub const RESET_WELCOME_TEXT: &str = "Conversation reset. How can I help next?";

/// How a user turn ended. Every outcome other than `Completed` and
/// `CredentialMissing` has also appended a diagnostic assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered without further tool calls.
    Completed { followups: usize },
    /// The model kept calling tools past [`MAX_FOLLOWUP_ROUNDS`].
    DepthLimited,
    /// The endpoint rejected the credential; it has been cleared.
    AuthFailed,
    /// No credential was available and the prompt was cancelled.
    CredentialMissing,
    /// Tool-call generation failed again after the compact retry.
    ToolCallFormatFailed,
    Failed,
}

enum TurnState {
    BuildingRequest,
    BuildingFollowup(ToolBatch),
    AwaitingModel { request: ChatRequest, followup: bool },
    ExecutingTools(AssistantMessage),
    Terminal(TurnOutcome),
}

/// Per-turn bookkeeping.
struct Turn {
    id: String,
    user_text: String,
    api_key: String,
    tools: Vec<ToolDescriptor>,
    compact_retry_used: bool,
    followups: usize,
}

pub struct Orchestrator<M: ChatModelClient, D: PartHistory> {
    config: ChatConfig,
    model: M,
    document: D,
    messages: MessageStore,
    catalog: ToolCatalog,
    credentials: CredentialCache,
    prompt: Box<dyn CredentialPrompt>,
    capabilities: Box<dyn ImageCapability>,
    bus: Arc<EventBus>,
}

impl<M: ChatModelClient, D: PartHistory> Orchestrator<M, D> {
    /// The tool catalog is built here, once, from the document's registry.
    pub fn new(
        config: ChatConfig,
        model: M,
        document: D,
        prompt: Box<dyn CredentialPrompt>,
        bus: Arc<EventBus>,
    ) -> Self {
        let catalog = ToolCatalog::build(document.feature_registry());
        let credentials = CredentialCache::new(config.api_key.clone());
        Self {
            config,
            model,
            document,
            messages: MessageStore::new(),
            catalog,
            credentials,
            prompt,
            capabilities: Box::new(NameHintCapabilities::default()),
            bus,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Box<dyn ImageCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.bus.subscribe()
    }

    pub fn has_credential(&self) -> bool {
        self.credentials.is_set()
    }

    /// Replaces the cached API key. Blank input clears it.
    pub fn set_api_key(&mut self, api_key: &str) -> bool {
        self.credentials.set(api_key)
    }

    /// Clears the history and starts over with a welcome message.
    pub fn reset_conversation(&mut self) {
        self.messages.reset();
        self.bus
            .emit(CATEGORY_CONVERSATION, EVENT_CONVERSATION_RESET, None, json!({}));
        tracing::info!("conversation reset");
        self.append_assistant(None, RESET_WELCOME_TEXT);
    }

    pub fn delete_message(&mut self, id: u64) -> bool {
        let removed = self.messages.delete(id);
        if removed {
            self.bus.emit(
                CATEGORY_CONVERSATION,
                EVENT_MESSAGE_DELETED,
                None,
                json!({ "id": id }),
            );
        }
        removed
    }

    /// Runs one user turn to completion.
    pub async fn send_user_message(&mut self, text: &str) -> TurnOutcome {
        let turn_id = Uuid::new_v4().to_string();
        tracing::info!(turn_id = %turn_id, text = %preview_text(text), "turn started");
        let id = self.messages.append(Role::User, text);
        self.emit_appended(Some(&turn_id), id, Role::User);

        let Some(api_key) = self.ensure_credential().await else {
            tracing::info!(turn_id = %turn_id, "no API key available; turn skipped");
            return TurnOutcome::CredentialMissing;
        };

        let mut turn = Turn {
            tools: self.catalog.select(text, SelectionMode::Normal),
            id: turn_id,
            user_text: text.to_string(),
            api_key,
            compact_retry_used: false,
            followups: 0,
        };

        let mut state = TurnState::BuildingRequest;
        loop {
            state = match state {
                TurnState::BuildingRequest => self.build_request(&turn, None).await,
                TurnState::BuildingFollowup(batch) => {
                    turn.followups += 1;
                    self.build_request(&turn, Some(&batch)).await
                }
                TurnState::AwaitingModel { request, followup } => {
                    self.await_model(&mut turn, request, followup).await
                }
                TurnState::ExecutingTools(response) => self.execute_batch(&turn, response).await,
                TurnState::Terminal(outcome) => {
                    tracing::info!(turn_id = %turn.id, outcome = ?outcome, "turn finished");
                    return outcome;
                }
            };
        }
    }

    async fn ensure_credential(&mut self) -> Option<String> {
        if let Some(secret) = self.credentials.get() {
            return Some(secret.to_string());
        }
        let entered = self.prompt.request_secret(None).await?;
        if !self.credentials.set(entered) {
            return None;
        }
        self.credentials.get().map(str::to_string)
    }

    fn projection(&self) -> Projection {
        Projection::Api {
            supports_images: self.capabilities.supports_images(&self.model.model_id()),
        }
    }

    async fn build_request(&mut self, turn: &Turn, batch: Option<&ToolBatch>) -> TurnState {
        let history_json = match self.document.to_json().await {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(turn_id = %turn.id, "failed to serialize part history: {e}");
                return self.finish(&turn.id, TurnOutcome::Failed, GENERIC_FAILURE_TEXT);
            }
        };
        let target = self.projection();
        let messages = match batch {
            None => request::initial_messages(&self.messages, &history_json, target),
            Some(batch) => request::followup_messages(&self.messages, &history_json, target, batch),
        };
        TurnState::AwaitingModel {
            request: ChatRequest::new(self.model.model_id(), messages, &turn.tools),
            followup: batch.is_some(),
        }
    }

    async fn await_model(&mut self, turn: &mut Turn, request: ChatRequest, followup: bool) -> TurnState {
        self.log_request(turn, &request, followup);

        match self.model.create_chat_completion(&turn.api_key, &request).await {
            Ok(response) => self.handle_response(turn, response),
            Err(ModelError::Auth(message)) => {
                tracing::warn!(turn_id = %turn.id, "authentication failed: {message}");
                self.credentials.invalidate();
                self.finish(&turn.id, TurnOutcome::AuthFailed, AUTH_FAILED_TEXT)
            }
            Err(ModelError::ToolCallGeneration {
                message,
                failed_generation,
            }) => {
                if !turn.compact_retry_used {
                    turn.compact_retry_used = true;
                    turn.tools = self.catalog.select(&turn.user_text, SelectionMode::Compact);
                    tracing::warn!(turn_id = %turn.id, tools = turn.tools.len(), "tool-call generation failed; retrying with compact toolset: {message}");
                    self.notice(
                        &turn.id,
                        format!(
                            "Tool-calling failed with model output formatting. Retrying with a compact toolset ({} tools)...",
                            turn.tools.len()
                        ),
                    );
                    let request = ChatRequest::new(request.model, request.messages, &turn.tools);
                    return TurnState::AwaitingModel { request, followup };
                }
                tracing::warn!(turn_id = %turn.id, "tool-call generation failed after compact retry: {message}");
                let text = match failed_generation {
                    Some(fragment) => format!("Tool-calling failed (400). failed_generation: {fragment}"),
                    None => format!("Tool-calling failed (400). {message}"),
                };
                self.finish(&turn.id, TurnOutcome::ToolCallFormatFailed, &text)
            }
            Err(e) => {
                tracing::warn!(turn_id = %turn.id, followup, "model request failed: {e}");
                if followup {
                    let text = format!("Failed to complete after tool calls: {e}");
                    self.finish(&turn.id, TurnOutcome::Failed, &text)
                } else {
                    self.finish(&turn.id, TurnOutcome::Failed, GENERIC_FAILURE_TEXT)
                }
            }
        }
    }

    fn handle_response(&mut self, turn: &Turn, response: AssistantMessage) -> TurnState {
        tracing::debug!(
            turn_id = %turn.id,
            content = %preview_text(response.content_text()),
            tool_calls = ?response.tool_calls().iter().map(|c| c.name()).collect::<Vec<_>>(),
            "model response"
        );

        if response.tool_calls().is_empty() {
            if !response.content_text().is_empty() {
                self.append_assistant(Some(&turn.id), response.content_text());
            }
            return TurnState::Terminal(TurnOutcome::Completed {
                followups: turn.followups,
            });
        }

        if turn.followups >= MAX_FOLLOWUP_ROUNDS {
            tracing::warn!(turn_id = %turn.id, followups = turn.followups, "tool loop depth limit reached");
            if !response.content_text().is_empty() {
                self.append_assistant(Some(&turn.id), response.content_text());
            }
            return self.finish(&turn.id, TurnOutcome::DepthLimited, DEPTH_LIMIT_TEXT);
        }
        TurnState::ExecutingTools(response)
    }

    /// Runs every call in order, then records the issuing assistant entry
    /// followed by the results.
    async fn execute_batch(&mut self, turn: &Turn, response: AssistantMessage) -> TurnState {
        let calls = response.tool_calls().to_vec();
        let mut results = Vec::with_capacity(calls.len());
        {
            let mut ctx = ToolContext {
                document: &mut self.document,
                messages: &mut self.messages,
                bus: self.bus.as_ref(),
                turn_id: &turn.id,
                screenshot_after_mutation: self.config.screenshot_after_mutation,
            };
            for call in &calls {
                let result = dispatch::execute_tool_call(&mut ctx, &self.catalog, call).await;
                results.push((call.id.clone(), result));
            }
        }

        let assistant_entry = self
            .messages
            .append_assistant_tool_calls(response.content_text(), calls);
        self.emit_appended(Some(&turn.id), assistant_entry, Role::Assistant);

        let mut result_entries = Vec::with_capacity(results.len());
        for (call_id, result) in results {
            let id = self.messages.append_tool_result(call_id, result);
            self.emit_appended(Some(&turn.id), id, Role::Tool);
            result_entries.push(id);
        }

        TurnState::BuildingFollowup(ToolBatch {
            assistant_entry,
            result_entries,
        })
    }

    fn log_request(&self, turn: &Turn, request: &ChatRequest, followup: bool) {
        let orphans = find_orphan_tool_messages(&request.messages);
        if !orphans.is_empty() {
            tracing::warn!(turn_id = %turn.id, count = orphans.len(), "request contains orphan tool messages");
            self.bus.emit(
                CATEGORY_AGENT,
                EVENT_ORPHAN_TOOL_MESSAGES,
                Some(turn.id.clone()),
                json!({ "issues": serde_json::to_value(&orphans).unwrap_or_default() }),
            );
        }
        tracing::debug!(
            turn_id = %turn.id,
            followup,
            model = %request.model,
            tools = ?request.tool_names(),
            messages = %serde_json::to_string(&summarize_messages(&request.messages)).unwrap_or_default(),
            "model request"
        );
    }

    fn finish(&mut self, turn_id: &str, outcome: TurnOutcome, text: &str) -> TurnState {
        self.append_assistant(Some(turn_id), text);
        TurnState::Terminal(outcome)
    }

    fn append_assistant(&mut self, turn_id: Option<&str>, text: &str) {
        let id = self.messages.append(Role::Assistant, text);
        self.emit_appended(turn_id, id, Role::Assistant);
    }

    fn notice(&self, turn_id: &str, text: String) {
        self.bus.emit(
            CATEGORY_AGENT,
            EVENT_AGENT_NOTICE,
            Some(turn_id.to_string()),
            json!({ "text": text }),
        );
    }

    fn emit_appended(&self, turn_id: Option<&str>, id: u64, role: Role) {
        self.bus.emit(
            CATEGORY_CONVERSATION,
            EVENT_MESSAGE_APPENDED,
            turn_id.map(str::to_string),
            json!({ "id": id, "role": role }),
        );
    }
}
