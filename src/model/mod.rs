//! Model client for chat-completions providers.
//!
//! ## Structure
//!
//! - `types`: Wire types (messages, tool calls, requests) and `ModelError`
//! - `traits`: Client trait (`ChatModelClient`)
//! - `capabilities`: Image-input capability lookup
//! - `prompts`: System prompt and part-history context message
//! - `providers/`: Provider implementations (OpenAI-compatible HTTP)

pub mod capabilities;
pub mod prompts;
pub mod providers;
pub mod traits;
pub mod types;


pub use capabilities::{ImageCapability, NameHintCapabilities};
pub use providers::openai_compat::OpenAiCompatClient;
pub use traits::ChatModelClient;
pub use types::{
    AssistantMessage, ChatCompletionResponse, ChatMessage, ChatRequest, ChatRole, ChatTool,
    ContentPart, FunctionCall, ImageUrl, MessageContent, ModelError, ToolCall,
};
