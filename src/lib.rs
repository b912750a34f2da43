//! Leadscribe — call-recording-to-CRM pipeline.
//!
//! Scans a mailbox for emails whose subject names a CRM contact, pulls
//! their audio/video attachments, transcribes them, derives structured
//! contact fields from the transcript via an LLM, and writes the result
//! (property updates + attached media note) into HubSpot.

pub mod config;
pub mod crm;
pub mod error;
pub mod extract;
pub mod llm;
pub mod mailbox;
pub mod pipeline;
pub mod transcribe;
