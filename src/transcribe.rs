//! Audio/video transcription.
//!
//! The original workflow ran a local speech model; here transcription
//! is an HTTP collaborator behind a trait so tests can substitute a
//! scripted fake.

use std::path::Path;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::OpenAiConfig;
use crate::error::TranscribeError;

/// Opaque transcription function: media file in, plain text out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, path: &Path) -> Result<String, TranscribeError>;
}

/// OpenAI audio-transcriptions client.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: secrecy::SecretString,
    model: String,
    base_url: String,
}

impl OpenAiTranscriber {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.transcribe_model.clone(),
            base_url: "https://api.openai.com".to_string(),
        }
    }

    /// Point the transcriber at a different host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String, TranscribeError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TranscribeError::MediaRead {
                path: path.display().to_string(),
                source: e,
            })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            );

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscribeError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::RequestFailed(e.to_string()))?;

        Ok(parsed.text)
    }
}
