//! Traits for model clients.

use crate::model::types::{AssistantMessage, ChatRequest, ModelError};

/// A chat-completions endpoint with function calling.
///
/// The API key is supplied per call so a rejected credential can be
/// invalidated without rebuilding the client.
#[allow(async_fn_in_trait)]
pub trait ChatModelClient: Send + Sync {
    fn model_id(&self) -> String;

    async fn create_chat_completion(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<AssistantMessage, ModelError>;
}
