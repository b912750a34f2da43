//! LLM integration — one-shot chat completions.
//!
//! The pipeline only ever needs a single completion per transcript, so
//! the provider trait is deliberately small: system prompt + user
//! prompt in, raw text out. Temperature is pinned at zero so repeated
//! runs over the same transcript extract the same fields.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::OpenAiConfig;
use crate::error::LlmError;

/// One-shot completion provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a single completion. No streaming, no retry.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// OpenAI chat-completions provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: secrecy::SecretString,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
            base_url: "https://api.openai.com".to_string(),
        }
    }

    /// Point the provider at a different host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: "openai".into(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: "openai".into(),
                reason: e.to_string(),
            })?;

        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "openai".into(),
                reason: "no completion choices in response".into(),
            })?;

        Ok(content.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use secrecy::SecretString;

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        let config = OpenAiConfig {
            api_key: SecretString::from("sk-test"),
            chat_model: "gpt-4o-mini".to_string(),
            transcribe_model: "whisper-1".to_string(),
        };
        OpenAiProvider::new(&config).with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn complete_returns_message_content() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(r#"{"temperature": 0}"#);
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"content": "  {\"jobtitle\": \"CTO\"}  "}}]
                }));
            });

        let provider = provider_for(&server);
        let out = provider.complete("system", "user").await.unwrap();
        mock.assert();
        assert_eq!(out, "{\"jobtitle\": \"CTO\"}");
    }

    #[tokio::test]
    async fn complete_propagates_api_errors() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401).body("bad key");
            });

        let provider = provider_for(&server);
        let err = provider.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(serde_json::json!({"choices": []}));
            });

        let provider = provider_for(&server);
        let err = provider.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}
