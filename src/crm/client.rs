//! HubSpot HTTP client.
//!
//! Four synchronous request/response operations, no retry/backoff:
//! contact search, property patch, file upload, note engagement.
//! A note with `hs_attachment_ids` is what makes the uploaded file
//! show up in the contact's Attachments section.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::CrmConfig;
use crate::crm::payload::ContactUpdatePayload;
use crate::error::CrmError;

/// HubSpot association type id for Note → Contact.
const NOTE_TO_CONTACT_ASSOCIATION: u32 = 202;

/// Files API folder for uploaded call media.
const UPLOAD_FOLDER: &str = "/email-audio";

/// A file stored in the HubSpot Files API.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: String,
    pub url: String,
}

/// HubSpot client, bearer-token auth.
pub struct CrmClient {
    client: reqwest::Client,
    access_token: secrecy::SecretString,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

impl CrmClient {
    pub fn new(config: &CrmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: config.access_token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up a contact id by email. `Ok(None)` when no contact matches.
    pub async fn find_contact_by_email(&self, email: &str) -> Result<Option<String>, CrmError> {
        let endpoint = "/crm/v3/objects/contacts/search";
        let body = serde_json::json!({
            "filterGroups": [{
                "filters": [{
                    "propertyName": "email",
                    "operator": "EQ",
                    "value": email.trim().to_lowercase(),
                }]
            }]
        });

        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        let parsed: SearchResponse = Self::check(endpoint, response).await?.json().await.map_err(
            |e| CrmError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            },
        )?;

        Ok(parsed.results.into_iter().next().map(|hit| hit.id))
    }

    /// Patch contact properties. An empty payload is a no-op.
    pub async fn update_contact(
        &self,
        contact_id: &str,
        payload: &ContactUpdatePayload,
    ) -> Result<(), CrmError> {
        if payload.is_empty() {
            return Ok(());
        }

        let endpoint = format!("/crm/v3/objects/contacts/{contact_id}");
        let body = serde_json::json!({ "properties": payload });

        let response = self
            .client
            .patch(format!("{}{endpoint}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        Self::check(&endpoint, response).await?;
        Ok(())
    }

    /// Upload a media file to the Files API (private, `/email-audio`).
    pub async fn upload_file(&self, path: &Path) -> Result<UploadedFile, CrmError> {
        let endpoint = "/files/v3/files";

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CrmError::FileRead {
                path: path.display().to_string(),
                source: e,
            })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        // PRIVATE files can still be attached to engagements.
        let form = reqwest::multipart::Form::new()
            .text("folderPath", UPLOAD_FOLDER)
            .text("options", r#"{"access":"PRIVATE"}"#)
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename.clone()),
            );

        info!(file = %filename, "Uploading media file to HubSpot Files");

        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        let value: serde_json::Value = Self::check(endpoint, response)
            .await?
            .json()
            .await
            .map_err(|e| CrmError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        let id = value
            .get("id")
            .and_then(json_id)
            .ok_or(CrmError::MalformedResponse { field: "id".into() })?;
        let url = value
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        info!(file_id = %id, "File uploaded");
        Ok(UploadedFile { id, url })
    }

    /// Create a note engagement carrying the uploaded file, associated
    /// to the contact's timeline.
    pub async fn create_note_with_attachment(
        &self,
        contact_id: &str,
        file_id: &str,
        transcript: &str,
    ) -> Result<String, CrmError> {
        let endpoint = "/crm/v3/objects/notes";

        let note_body = if transcript.is_empty() {
            "Audio uploaded from email.".to_string()
        } else {
            format!("Audio uploaded from email.\n\nTranscript:\n{transcript}")
        };

        // HubSpot expects attachment ids as a string (comma-separated
        // when there are several).
        let body = serde_json::json!({
            "properties": {
                "hs_note_body": note_body,
                "hs_timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "hs_attachment_ids": file_id,
            },
            "associations": [{
                "to": { "id": contact_id },
                "types": [{
                    "associationCategory": "HUBSPOT_DEFINED",
                    "associationTypeId": NOTE_TO_CONTACT_ASSOCIATION,
                }]
            }]
        });

        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CrmError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        let value: serde_json::Value = Self::check(endpoint, response)
            .await?
            .json()
            .await
            .map_err(|e| CrmError::RequestFailed {
                endpoint: endpoint.into(),
                reason: e.to_string(),
            })?;

        value
            .get("id")
            .and_then(json_id)
            .ok_or(CrmError::MalformedResponse { field: "id".into() })
    }

    /// Full CRM write for one processed attachment: contact lookup,
    /// property patch, media upload, note engagement.
    ///
    /// Returns `Ok(false)` when the contact does not exist — the write
    /// is skipped with a diagnostic, not treated as an error.
    pub async fn save_call_result(
        &self,
        email: &str,
        media_path: &Path,
        payload: &ContactUpdatePayload,
    ) -> Result<bool, CrmError> {
        info!(contact = %email, "Looking up HubSpot contact");
        let Some(contact_id) = self.find_contact_by_email(email).await? else {
            warn!(contact = %email, "Contact not found in HubSpot, skipping CRM write");
            return Ok(false);
        };

        self.update_contact(&contact_id, payload).await?;
        for (key, value) in payload.properties() {
            info!(property = %key, value = %value, "Contact property updated");
        }

        let uploaded = self.upload_file(media_path).await?;
        self.create_note_with_attachment(&contact_id, &uploaded.id, "")
            .await?;

        info!(contact = %email, "HubSpot update complete");
        Ok(true)
    }

    /// Map non-2xx responses to `CrmError::ApiError`.
    async fn check(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CrmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(endpoint = %endpoint, status = %status, body = %body, "HubSpot request failed");
        Err(CrmError::ApiError {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

/// HubSpot ids arrive as JSON strings or numbers depending on the API.
fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::payload::build_payload;
    use crate::crm::vocab::Vocabulary;
    use crate::extract::ExtractedFields;
    use httpmock::prelude::*;
    use secrecy::SecretString;

    fn client_for(server: &MockServer) -> CrmClient {
        let config = CrmConfig {
            access_token: SecretString::from("pat-test"),
            base_url: server.base_url(),
        };
        CrmClient::new(&config)
    }

    #[tokio::test]
    async fn find_contact_returns_first_hit() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST)
                    .path("/crm/v3/objects/contacts/search")
                    .header("authorization", "Bearer pat-test")
                    .body_contains("max@example.com");
                then.status(200).json_body(serde_json::json!({
                    "results": [{"id": "4711"}, {"id": "999"}]
                }));
            });

        let client = client_for(&server);
        let id = client
            .find_contact_by_email(" Max@Example.com ")
            .await
            .unwrap();
        mock.assert();
        assert_eq!(id.as_deref(), Some("4711"));
    }

    #[tokio::test]
    async fn find_contact_none_for_empty_results() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/crm/v3/objects/contacts/search");
                then.status(200).json_body(serde_json::json!({"results": []}));
            });

        let client = client_for(&server);
        let id = client.find_contact_by_email("nobody@example.com").await.unwrap();
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn update_contact_patches_properties() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(httpmock::Method::PATCH)
                    .path("/crm/v3/objects/contacts/4711")
                    .body_contains("\"jobtitle\":\"CTO\"")
                    .body_contains("\"expat\":\"false\"");
                then.status(200).json_body(serde_json::json!({"id": "4711"}));
            });

        let fields = ExtractedFields {
            jobtitle: "CTO".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &Vocabulary::builtin());

        let client = client_for(&server);
        client.update_contact("4711", &payload).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn update_contact_empty_payload_is_noop() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(httpmock::Method::PATCH).path_contains("/crm/v3/objects/contacts/");
                then.status(200);
            });

        let client = client_for(&server);
        client
            .update_contact("4711", &ContactUpdatePayload::default())
            .await
            .unwrap();
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn update_contact_surfaces_api_error() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(httpmock::Method::PATCH).path("/crm/v3/objects/contacts/4711");
                then.status(400).body("PROPERTY_DOESNT_EXIST");
            });

        let fields = ExtractedFields {
            jobtitle: "CTO".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &Vocabulary::builtin());

        let client = client_for(&server);
        let err = client.update_contact("4711", &payload).await.unwrap_err();
        assert!(matches!(err, CrmError::ApiError { status: 400, .. }));
    }

    #[tokio::test]
    async fn upload_file_returns_id_and_url() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST).path("/files/v3/files");
                then.status(201).json_body(serde_json::json!({
                    "id": 186099, "url": "https://files.example/186099"
                }));
            });

        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("call.mp3");
        std::fs::write(&media, b"bytes").unwrap();

        let client = client_for(&server);
        let uploaded = client.upload_file(&media).await.unwrap();
        mock.assert();
        assert_eq!(uploaded.id, "186099");
        assert_eq!(uploaded.url, "https://files.example/186099");
    }

    #[tokio::test]
    async fn note_carries_attachment_and_association() {
        let server = MockServer::start();
        let mock = server
            .mock(|when, then| {
                when.method(POST)
                    .path("/crm/v3/objects/notes")
                    .body_contains("\"hs_attachment_ids\":\"186099\"")
                    .body_contains("\"associationTypeId\":202")
                    .body_contains("Audio uploaded from email.");
                then.status(201).json_body(serde_json::json!({"id": "note-1"}));
            });

        let client = client_for(&server);
        let note_id = client
            .create_note_with_attachment("4711", "186099", "")
            .await
            .unwrap();
        mock.assert();
        assert_eq!(note_id, "note-1");
    }

    #[tokio::test]
    async fn save_call_result_skips_missing_contact() {
        let server = MockServer::start();
        server
            .mock(|when, then| {
                when.method(POST).path("/crm/v3/objects/contacts/search");
                then.status(200).json_body(serde_json::json!({"results": []}));
            });
        // No patch/upload/note mocks: reaching them would fail the test
        // with a connection error on an unmatched route.

        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("call.mp3");
        std::fs::write(&media, b"bytes").unwrap();

        let client = client_for(&server);
        let written = client
            .save_call_result(
                "nobody@example.com",
                &media,
                &ContactUpdatePayload::default(),
            )
            .await
            .unwrap();
        assert!(!written);
    }
}
