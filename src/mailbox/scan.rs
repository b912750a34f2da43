//! Subject matching and media-attachment extraction.
//!
//! The subject line decides which CRM contact an email belongs to: a
//! message qualifies when the target contact email appears in the
//! subject, case-insensitively. Attachments qualify by file extension.

use mail_parser::{Message, MimeHeaders};

/// Attachment extensions the pipeline will transcribe.
pub const MEDIA_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "mp4"];

/// A qualifying attachment pulled out of a message.
#[derive(Debug, Clone)]
pub struct MediaAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Case-insensitive substring match of the target contact email in the
/// subject line.
pub fn subject_matches(subject: &str, target_email: &str) -> bool {
    subject
        .to_lowercase()
        .contains(&target_email.trim().to_lowercase())
}

/// Does the filename carry one of the allowed media extensions?
pub fn is_media_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    MEDIA_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Collect the qualifying media attachments of a parsed message.
///
/// Messages without attachments (or without a multipart body) yield an
/// empty list; unnamed parts and non-media extensions are skipped.
pub fn media_attachments(message: &Message) -> Vec<MediaAttachment> {
    let mut found = Vec::new();

    for part in message.attachments() {
        let Some(filename) = part.attachment_name() else {
            continue;
        };
        if !is_media_filename(filename) {
            continue;
        }
        let contents = part.contents();
        if contents.is_empty() {
            continue;
        }
        found.push(MediaAttachment {
            filename: filename.to_string(),
            bytes: contents.to_vec(),
        });
    }

    found
}
