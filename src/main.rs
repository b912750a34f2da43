use std::sync::Arc;

use leadscribe::config::{CrmConfig, MailboxConfig, OpenAiConfig, StorageConfig};
use leadscribe::crm::CrmClient;
use leadscribe::llm::OpenAiProvider;
use leadscribe::pipeline::Pipeline;
use leadscribe::transcribe::OpenAiTranscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let Some(target_email) = std::env::args().nth(1) else {
        eprintln!("Usage: leadscribe <contact-email>");
        eprintln!("  Scans the mailbox for emails whose subject names the contact,");
        eprintln!("  transcribes their audio/video attachments and updates HubSpot.");
        std::process::exit(2);
    };

    // Credential/config errors are fatal at startup.
    let mailbox = MailboxConfig::from_env()?;
    let openai = OpenAiConfig::from_env()?;
    let crm_config = CrmConfig::from_env()?;
    let storage = StorageConfig::from_env();

    eprintln!("Leadscribe v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Target:     {}", target_email.trim());
    eprintln!("   Mailbox:    {}:{}", mailbox.imap_host, mailbox.imap_port);
    eprintln!("   Chat model: {}", openai.chat_model);
    eprintln!("   Transcribe: {}", openai.transcribe_model);
    eprintln!("   Downloads:  {}", storage.download_dir.display());
    eprintln!("   Transcripts: {}\n", storage.transcript_dir.display());

    let llm = Arc::new(OpenAiProvider::new(&openai));
    let transcriber = Arc::new(OpenAiTranscriber::new(&openai));
    let crm = CrmClient::new(&crm_config);

    let pipeline = Pipeline::new(storage, llm, transcriber, crm);
    let summary = pipeline.run(&mailbox, &target_email).await?;

    eprintln!(
        "Done: {} matching email(s), {} attachment(s) processed, {} failed",
        summary.messages_matched, summary.attachments_processed, summary.attachments_failed,
    );

    Ok(())
}
