//! Error types for Leadscribe.

/// Top-level error type for the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors. These are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mailbox (IMAP) errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("IMAP login failed for {username}")]
    LoginFailed { username: String },

    #[error("IMAP command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Message {seq} could not be parsed")]
    UnparsableMessage { seq: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transcription errors.
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("Transcription request failed: {0}")]
    RequestFailed(String),

    #[error("Transcription service returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Could not read media file {path}: {source}")]
    MediaRead {
        path: String,
        source: std::io::Error,
    },
}

/// Language-model provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CRM (HubSpot) errors.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("CRM request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("CRM returned {status} for {endpoint}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("CRM response missing field {field}")]
    MalformedResponse { field: String },

    #[error("Could not read upload file {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
}

/// Pipeline orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write attachment {path}: {source}")]
    WriteAttachment {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to write transcript {path}: {source}")]
    WriteTranscript {
        path: String,
        source: std::io::Error,
    },

    #[error("Mailbox task failed: {0}")]
    MailboxTask(String),
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
