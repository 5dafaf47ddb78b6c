use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ChatMessage, ChatRole, ContentPart, ImageUrl, MessageContent, ToolCall};

/// Caption used when an image entry has neither text nor caption.
pub const DEFAULT_IMAGE_LABEL: &str = "Screenshot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: String },
    Image { caption: String, data_uri: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub body: MessageBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn text(&self) -> &str {
        match &self.body {
            MessageBody::Text { text } => text,
            MessageBody::Image { caption, .. } => caption,
        }
    }

    fn image_label(&self) -> String {
        match &self.body {
            MessageBody::Image { caption, .. } if !caption.trim().is_empty() => caption.clone(),
            _ => DEFAULT_IMAGE_LABEL.to_string(),
        }
    }
}

/// Who the projection is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Model endpoint: image entries become `user` messages; image parts
    /// only when the model accepts them, caption text otherwise.
    Api { supports_images: bool },
    /// Presentation layer: original roles, images kept.
    Display,
}

#[derive(Debug)]
pub struct MessageStore {
    messages: Vec<Message>,
    next_id: u64,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: u64) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) -> u64 {
        self.push(role, MessageBody::Text { text: text.into() }, Vec::new(), None)
    }

    pub fn append_image(
        &mut self,
        role: Role,
        caption: impl Into<String>,
        data_uri: impl Into<String>,
    ) -> u64 {
        let body = MessageBody::Image {
            caption: caption.into(),
            data_uri: data_uri.into(),
        };
        self.push(role, body, Vec::new(), None)
    }

    pub fn append_assistant_tool_calls(
        &mut self,
        text: impl Into<String>,
        calls: Vec<ToolCall>,
    ) -> u64 {
        self.push(
            Role::Assistant,
            MessageBody::Text { text: text.into() },
            calls,
            None,
        )
    }

    pub fn append_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> u64 {
        self.push(
            Role::Tool,
            MessageBody::Text {
                text: content.into(),
            },
            Vec::new(),
            Some(tool_call_id.into()),
        )
    }

    /// Removes the entry with this id. Returns false when no entry matched.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }

    /// Clears the history and restarts ids at 1.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.next_id = 1;
    }

    pub fn project(&self, target: Projection) -> Vec<ChatMessage> {
        self.project_except(target, &HashSet::new())
    }

    /// Projection that skips the given entry ids.
    pub fn project_except(&self, target: Projection, skip: &HashSet<u64>) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| !skip.contains(&m.id))
            .map(|m| project_message(m, target))
            .collect()
    }

    /// Projects the given entries in the given order. Unknown ids are
    /// skipped.
    pub fn project_ids(&self, target: Projection, ids: &[u64]) -> Vec<ChatMessage> {
        ids.iter()
            .filter_map(|id| self.get(*id))
            .map(|m| project_message(m, target))
            .collect()
    }

    fn push(
        &mut self,
        role: Role,
        body: MessageBody,
        tool_calls: Vec<ToolCall>,
        tool_call_id: Option<String>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message {
            id,
            role,
            body,
            tool_calls,
            tool_call_id,
            created_at: Utc::now(),
        });
        id
    }
}

fn chat_role(role: Role) -> ChatRole {
    match role {
        Role::User => ChatRole::User,
        Role::Assistant => ChatRole::Assistant,
        Role::Tool => ChatRole::Tool,
    }
}

fn project_message(message: &Message, target: Projection) -> ChatMessage {
    if message.role == Role::Tool {
        return ChatMessage::tool_result(
            message.tool_call_id.clone().unwrap_or_default(),
            message.text(),
        );
    }
    if !message.tool_calls.is_empty() {
        return ChatMessage::assistant_tool_calls(message.text(), message.tool_calls.clone());
    }

    match (&message.body, target) {
        (MessageBody::Text { text }, _) => ChatMessage::text(chat_role(message.role), text.clone()),
        (MessageBody::Image { data_uri, .. }, Projection::Display) => {
            image_message(chat_role(message.role), message.image_label(), data_uri)
        }
        (MessageBody::Image { data_uri, .. }, Projection::Api { supports_images: true }) => {
            image_message(ChatRole::User, message.image_label(), data_uri)
        }
        (MessageBody::Image { .. }, Projection::Api { supports_images: false }) => {
            ChatMessage::text(ChatRole::User, message.image_label())
        }
    }
}

fn image_message(role: ChatRole, label: String, data_uri: &str) -> ChatMessage {
    ChatMessage {
        role,
        content: Some(MessageContent::Parts(vec![
            ContentPart::Text { text: label },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_uri.to_string(),
                },
            },
        ])),
        tool_calls: None,
        tool_call_id: None,
    }
}
