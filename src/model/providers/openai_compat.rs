use std::time::Duration;

use serde_json::Value;

use crate::model::{AssistantMessage, ChatCompletionResponse, ChatModelClient, ChatRequest, ModelError};

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiCompatClient {
    pub model: String,
    pub base_url: String,
    client: reqwest::Client,
    provider_name: &'static str,
}

impl OpenAiCompatClient {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        provider_name: &'static str,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            model: model.into(),
            base_url: base_url.into(),
            client,
            provider_name,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl ChatModelClient for OpenAiCompatClient {
    fn model_id(&self) -> String {
        self.model.clone()
    }

    async fn create_chat_completion(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<AssistantMessage, ModelError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {api_key}"))
            .json(request)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        tracing::debug!("{} API response: status={}", self.provider_name, status);

        if !status.is_success() {
            return Err(classify_error(self.provider_name, status.as_u16(), &text));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            ModelError::InvalidResponse(format!("{} parse failed: {e}", self.provider_name))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| {
                ModelError::InvalidResponse(format!(
                    "missing choices[0].message from {} response",
                    self.provider_name
                ))
            })
    }
}

/// Maps a non-success response onto the error classes the orchestrator
/// reacts to.
pub fn classify_error(provider_name: &str, status: u16, body: &str) -> ModelError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());
    let lowered = message.to_lowercase();

    if status == 401 || lowered.contains("invalid api key") {
        return ModelError::Auth(format!("{provider_name} auth failed ({status}): {message}"));
    }

    if status == 400
        && (lowered.contains("failed to call a function") || lowered.contains("failed_generation"))
    {
        let failed_generation = error
            .and_then(|e| e.get("failed_generation"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        return ModelError::ToolCallGeneration {
            message,
            failed_generation,
        };
    }

    ModelError::Request(format!("{provider_name} error {status}: {body}"))
}
