//! HubSpot integration: controlled vocabularies, payload
//! reconciliation, and the HTTP client.

pub mod client;
pub mod payload;
pub mod vocab;

pub use client::{CrmClient, UploadedFile};
pub use payload::{ContactUpdatePayload, build_payload};
pub use vocab::Vocabulary;
