//! Environment-driven configuration.
//!
//! Credentials live in `secrecy::SecretString` and are never logged.
//! Missing credentials are fatal at startup — the pipeline refuses to
//! run half-configured.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default cap on how many recent mailbox messages are scanned per run.
pub const DEFAULT_MAX_MESSAGES: usize = 20;

/// Mailbox (IMAP) configuration.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub username: String,
    pub password: SecretString,
    /// Most-recent-first message cap per run.
    pub max_messages: usize,
}

impl MailboxConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let imap_host = require_env("LEADSCRIBE_IMAP_HOST")?;

        let imap_port: u16 = match std::env::var("LEADSCRIBE_IMAP_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "LEADSCRIBE_IMAP_PORT".into(),
                message: format!("not a valid port: {raw}"),
            })?,
            Err(_) => 993,
        };

        let username = require_env("LEADSCRIBE_IMAP_USERNAME")?;
        let password = SecretString::from(require_env("LEADSCRIBE_IMAP_PASSWORD")?);

        let max_messages = std::env::var("LEADSCRIBE_MAX_MESSAGES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_MESSAGES);

        Ok(Self {
            imap_host,
            imap_port,
            username,
            password,
            max_messages,
        })
    }
}

/// OpenAI configuration — one key shared by chat extraction and
/// audio transcription.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    /// Chat model used for field extraction.
    pub chat_model: String,
    /// Transcription model (the model-size knob of the transcriber).
    pub transcribe_model: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = SecretString::from(require_env("OPENAI_API_KEY")?);
        let chat_model = std::env::var("LEADSCRIBE_CHAT_MODEL")
            .unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let transcribe_model = std::env::var("LEADSCRIBE_TRANSCRIBE_MODEL")
            .unwrap_or_else(|_| "whisper-1".to_string());

        Ok(Self {
            api_key,
            chat_model,
            transcribe_model,
        })
    }
}

/// HubSpot configuration.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub access_token: SecretString,
    pub base_url: String,
}

impl CrmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_token = SecretString::from(require_env("HUBSPOT_ACCESS_TOKEN")?);
        let base_url = std::env::var("HUBSPOT_BASE_URL")
            .unwrap_or_else(|_| "https://api.hubapi.com".to_string());

        Ok(Self {
            access_token,
            base_url,
        })
    }
}

/// Local filesystem layout for downloaded media and transcripts.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub download_dir: PathBuf,
    pub transcript_dir: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let download_dir = std::env::var("LEADSCRIBE_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("downloads"));
        let transcript_dir = std::env::var("LEADSCRIBE_TRANSCRIPT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("transcripts"));

        Self {
            download_dir,
            transcript_dir,
        }
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}
