//! Sequential pipeline orchestrator.
//!
//! One run: list recent mailbox messages, keep those whose subject
//! names the target contact, then per media attachment — persist,
//! transcribe, extract fields, reconcile, write to CRM.
//!
//! Failure isolation: an error in transcription, extraction, or the
//! CRM write aborts only the current attachment; the run continues
//! with the next one. Mailbox listing errors abort the run since
//! there is nothing left to iterate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mail_parser::MessageParser;
use tracing::{error, info, warn};

use crate::config::{MailboxConfig, StorageConfig};
use crate::crm::{CrmClient, Vocabulary, build_payload};
use crate::error::{Error, MailboxError, PipelineError, Result};
use crate::extract::FieldExtractor;
use crate::llm::LlmProvider;
use crate::mailbox::{ImapSession, media_attachments, subject_matches};
use crate::transcribe::Transcriber;

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub messages_matched: usize,
    pub attachments_processed: usize,
    pub attachments_failed: usize,
}

/// Outcome of scanning a single message.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageOutcome {
    pub matched: bool,
    pub processed: usize,
    pub failed: usize,
}

/// The wired-up pipeline. All collaborators are injected; the two
/// vocabulary maps are built once and shared read-only.
pub struct Pipeline {
    storage: StorageConfig,
    extractor: FieldExtractor,
    transcriber: Arc<dyn Transcriber>,
    crm: CrmClient,
    vocab: Vocabulary,
}

impl Pipeline {
    pub fn new(
        storage: StorageConfig,
        llm: Arc<dyn LlmProvider>,
        transcriber: Arc<dyn Transcriber>,
        crm: CrmClient,
    ) -> Self {
        Self {
            storage,
            extractor: FieldExtractor::new(llm),
            transcriber,
            crm,
            vocab: Vocabulary::builtin(),
        }
    }

    /// Run the pipeline once for one target contact.
    pub async fn run(&self, mailbox: &MailboxConfig, target_email: &str) -> Result<RunSummary> {
        let target = target_email.trim().to_lowercase();

        ensure_dir(&self.storage.download_dir).await?;
        ensure_dir(&self.storage.transcript_dir).await?;

        let config = mailbox.clone();
        let raw_messages = tokio::task::spawn_blocking(move || fetch_recent_raw(&config))
            .await
            .map_err(|e| Error::Pipeline(PipelineError::MailboxTask(e.to_string())))??;

        info!(count = raw_messages.len(), "Fetched candidate messages");

        let mut summary = RunSummary::default();
        for raw in &raw_messages {
            let outcome = self.process_raw_message(raw, &target).await;
            if outcome.matched {
                summary.messages_matched += 1;
            }
            summary.attachments_processed += outcome.processed;
            summary.attachments_failed += outcome.failed;
        }

        if summary.messages_matched == 0 {
            info!(target = %target, "No emails with audio attachments found");
        }

        Ok(summary)
    }

    /// Scan one raw RFC822 message and process its media attachments.
    pub async fn process_raw_message(&self, raw: &[u8], target_email: &str) -> MessageOutcome {
        let mut outcome = MessageOutcome::default();

        let Some(parsed) = MessageParser::default().parse(raw) else {
            warn!("Skipping unparsable message");
            return outcome;
        };

        let subject = parsed.subject().unwrap_or_default();
        if !subject_matches(subject, target_email) {
            return outcome;
        }
        outcome.matched = true;
        info!(subject = %subject, "Email subject matched");

        for attachment in media_attachments(&parsed) {
            match self
                .process_attachment(&attachment.filename, &attachment.bytes, target_email)
                .await
            {
                Ok(()) => outcome.processed += 1,
                Err(e) => {
                    error!(file = %attachment.filename, error = %e, "Attachment failed; continuing");
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    /// Persist → transcribe → extract → reconcile → CRM write, for one
    /// attachment.
    async fn process_attachment(
        &self,
        filename: &str,
        bytes: &[u8],
        target_email: &str,
    ) -> Result<()> {
        // Use only the final path component of whatever was in the
        // Content-Disposition header.
        let safe_name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let media_path = self.storage.download_dir.join(&safe_name);
        tokio::fs::write(&media_path, bytes).await.map_err(|e| {
            Error::Pipeline(PipelineError::WriteAttachment {
                path: media_path.display().to_string(),
                source: e,
            })
        })?;
        info!(path = %media_path.display(), "Saved attachment");

        let transcript = self.transcriber.transcribe(&media_path).await?;

        // One transcript file per target; overwritten across
        // attachments within a run.
        let txt_path = transcript_path(&self.storage.transcript_dir, target_email);
        tokio::fs::write(&txt_path, &transcript).await.map_err(|e| {
            Error::Pipeline(PipelineError::WriteTranscript {
                path: txt_path.display().to_string(),
                source: e,
            })
        })?;

        let fields = self.extractor.extract(&transcript).await?;
        let payload = build_payload(&fields, &self.vocab);

        self.crm
            .save_call_result(target_email, &media_path, &payload)
            .await?;

        Ok(())
    }
}

/// Transcript file path for a target address: `@` and `.` become `_`.
pub fn transcript_path(transcript_dir: &Path, target_email: &str) -> PathBuf {
    let stem: String = target_email
        .chars()
        .map(|c| if c == '@' || c == '.' { '_' } else { c })
        .collect();
    transcript_dir.join(format!("{stem}.txt"))
}

/// List the most recent messages in INBOX and fetch their raw bytes.
/// Blocking — run under `spawn_blocking`.
fn fetch_recent_raw(config: &MailboxConfig) -> std::result::Result<Vec<Vec<u8>>, MailboxError> {
    let mut session = ImapSession::connect(config)?;

    let mut seqs = session.search_all()?;
    seqs.reverse();
    seqs.truncate(config.max_messages);

    let mut messages = Vec::with_capacity(seqs.len());
    for seq in seqs {
        match session.fetch_raw(seq) {
            Ok(raw) => messages.push(raw),
            Err(e) => warn!(seq, error = %e, "Skipping unfetchable message"),
        }
    }

    session.logout();
    Ok(messages)
}

async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        Error::Pipeline(PipelineError::CreateDir {
            path: path.display().to_string(),
            source: e,
        })
    })
}
