//! Completion endpoint interface and HTTP implementation.

use crate::types::ChatMessage;
use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors returned by the completion gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// Endpoint answered with a non-success status.
    #[error("completion endpoint returned status {0}")]
    Status(u16),
    /// Response body did not carry a completion.
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// Sends a message list to a hosted completion service.
///
/// Any backend speaking the chat-completions shape is substitutable.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Request a completion and return the assistant's message content.
    async fn complete(&self, model: &str, messages: &[ChatMessage])
    -> Result<String, GatewayError>;
}

/// HTTP gateway for an OpenAI-compatible chat-completions endpoint.
pub struct HttpCompletionGateway {
    client: reqwest::Client,
    url: String,
    api_key: String,
    temperature: f64,
}

impl HttpCompletionGateway {
    /// Create a gateway for the given endpoint URL and bearer key.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
            temperature: 0.1,
        }
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl CompletionGateway for HttpCompletionGateway {
    /// POST the message list and extract the first choice's content.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
        });
        debug!(
            "requesting completion (model={}, messages={})",
            model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;
        extract_content(&body)
    }
}

/// Pull `choices[0].message.content` out of a completion response body.
fn extract_content(body: &Value) -> Result<String, GatewayError> {
    body.get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Malformed("no choices[0].message.content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::extract_content;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn extracts_first_choice_content() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "the essay"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        assert_eq!(extract_content(&body).expect("content"), "the essay");
    }

    #[test]
    fn missing_choices_is_malformed() {
        assert!(extract_content(&json!({})).is_err());
        assert!(extract_content(&json!({"choices": []})).is_err());
        assert!(extract_content(&json!({"choices": [{"message": {}}]})).is_err());
    }
}
