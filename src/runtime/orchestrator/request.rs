//! Request framing and diagnostics for model calls.

use std::collections::HashSet;

use serde::Serialize;

use crate::conversation::{MessageStore, Projection};
use crate::model::prompts::{part_history_context, system_prompt};
use crate::model::{ChatMessage, ChatRole, ContentPart, MessageContent, ToolCall};

pub(crate) const PREVIEW_LEN: usize = 240;

/// Store entries produced by one executed tool batch.
#[derive(Debug, Clone)]
pub(super) struct ToolBatch {
    /// Assistant entry that issued the calls.
    pub assistant_entry: u64,
    /// Tool-result entries, in call order.
    pub result_entries: Vec<u64>,
}

/// System prompt, then the part-history snapshot, then the conversation.
pub(super) fn initial_messages(
    store: &MessageStore,
    history_json: &str,
    target: Projection,
) -> Vec<ChatMessage> {
    let mut messages = framing(history_json);
    messages.extend(store.project(target));
    messages
}

/// Same framing as the initial request, with the batch's assistant entry and
/// its results moved to the end so every result directly follows the call
/// that produced it.
pub(super) fn followup_messages(
    store: &MessageStore,
    history_json: &str,
    target: Projection,
    batch: &ToolBatch,
) -> Vec<ChatMessage> {
    let ordered: Vec<u64> = std::iter::once(batch.assistant_entry)
        .chain(batch.result_entries.iter().copied())
        .collect();
    let skip: HashSet<u64> = ordered.iter().copied().collect();

    let mut messages = framing(history_json);
    messages.extend(store.project_except(target, &skip));
    messages.extend(store.project_ids(target, &ordered));
    messages
}

fn framing(history_json: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::text(ChatRole::System, system_prompt()),
        part_history_context(history_json),
    ]
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A `tool` message whose call id was not issued by a preceding assistant
/// message (or was already answered).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrphanToolMessage {
    pub index: usize,
    pub tool_call_id: Option<String>,
}

pub fn find_orphan_tool_messages(messages: &[ChatMessage]) -> Vec<OrphanToolMessage> {
    let mut pending: HashSet<&str> = HashSet::new();
    let mut orphans = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        match message.role {
            ChatRole::Assistant => {
                if let Some(calls) = &message.tool_calls {
                    pending.extend(calls.iter().map(|c| c.id.as_str()).filter(|id| !id.is_empty()));
                }
            }
            ChatRole::Tool => {
                let id = message.tool_call_id.as_deref().filter(|id| !id.is_empty());
                match id {
                    Some(id) if pending.remove(id) => {}
                    _ => orphans.push(OrphanToolMessage {
                        index,
                        tool_call_id: id.map(str::to_string),
                    }),
                }
            }
            _ => {}
        }
    }
    orphans
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallSummary {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl From<&ToolCall> for ToolCallSummary {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: preview_text(&call.function.arguments),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub index: usize,
    pub role: ChatRole,
    pub tool_call_id: Option<String>,
    pub tool_calls: Vec<ToolCallSummary>,
    pub preview: String,
}

pub fn summarize_messages(messages: &[ChatMessage]) -> Vec<MessageSummary> {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| MessageSummary {
            index,
            role: message.role,
            tool_call_id: message.tool_call_id.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .flatten()
                .map(ToolCallSummary::from)
                .collect(),
            preview: preview_content(message.content.as_ref()),
        })
        .collect()
}

fn preview_content(content: Option<&MessageContent>) -> String {
    match content {
        None => String::new(),
        Some(MessageContent::Text(text)) => preview_text(text),
        Some(MessageContent::Parts(parts)) => {
            let joined = parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.as_str(),
                    ContentPart::ImageUrl { .. } => "[image_url]",
                })
                .collect::<Vec<_>>()
                .join(" ");
            preview_text(&joined)
        }
    }
}

/// First [`PREVIEW_LEN`] characters, with `...` appended when cut.
pub fn preview_text(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
