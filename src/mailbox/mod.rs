//! Mailbox access: an explicit IMAP session plus subject/attachment
//! scanning over parsed messages.

pub mod imap;
pub mod scan;

pub use imap::ImapSession;
pub use scan::{MediaAttachment, media_attachments, subject_matches};
