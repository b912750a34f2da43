//! Field Extractor — transcript in, structured CRM fields out.
//!
//! Sends a deterministic prompt to the LLM and parses the JSON it
//! returns. Models wrap JSON in prose or markdown often enough that
//! parsing is lenient: strict parse first, then a brace-delimited
//! substring, then an empty-but-complete record.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::LlmProvider;

/// Values the `expat` field treats as affirmative (case-insensitive).
pub const EXPAT_AFFIRMATIVE: [&str; 4] = ["true", "yes", "ja", "1"];
/// Values the `expat` field treats as negative (case-insensitive).
pub const EXPAT_NEGATIVE: [&str; 4] = ["false", "no", "nein", "0"];

const SYSTEM_PROMPT: &str = "You extract CRM-ready structured data. Output ONLY valid JSON.";

/// Fields derived from one transcript. Immutable once returned:
/// produced by [`FieldExtractor::extract`], consumed once by the
/// payload reconciler, then discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub jobtitle: String,
    #[serde(default)]
    pub nationality: String,
    /// Strict domain after normalization: "true", "false" or "".
    #[serde(default, deserialize_with = "de_scalar_to_string")]
    pub expat: String,
    /// Comma-joined string, even when the model returns a JSON list.
    #[serde(default, deserialize_with = "de_string_or_list")]
    pub interested_products: String,
    #[serde(default)]
    pub lead_status: String,
    /// Not requested from the model; a payload slot for manual or
    /// future population that flows through if present.
    #[serde(default)]
    pub pot_einheiten: String,
}

/// Accept a bare scalar (string, bool, number) as a string.
fn de_scalar_to_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Accept either a string or a list of scalars, comma-joining the list.
fn de_string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Array(items) => items
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Extracts [`ExtractedFields`] from transcripts via an LLM provider.
pub struct FieldExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl FieldExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Run one extraction. A transport error propagates uncaught; a
    /// malformed model response degrades to an empty record instead.
    pub async fn extract(&self, transcript: &str) -> Result<ExtractedFields, LlmError> {
        let prompt = build_user_prompt(transcript);
        let raw = self.llm.complete(SYSTEM_PROMPT, &prompt).await?;
        debug!(model = self.llm.model_name(), bytes = raw.len(), "LLM extraction response");
        Ok(parse_model_response(&raw))
    }
}

/// Build the extraction prompt around the transcript.
pub fn build_user_prompt(transcript: &str) -> String {
    let schema = serde_json::json!({
        "jobtitle": "",
        "nationality": "",
        "expat": "",
        "interested_products": "",
        "lead_status": "",
    });

    format!(
        "Extract CRM fields from the transcript.\n\
         Return ONLY valid JSON. No extra text.\n\n\
         Rules:\n\
         - Transcript may be German or English.\n\
         - expat must be \"true\" or \"false\" (strings).\n\
         - nationality must be a COUNTRY name (e.g. Indien, Deutschland).\n\
         - interested_products must be a comma-separated string.\n\n\
         Return JSON exactly in this schema:\n{}\n\n\
         Transcript:\n\"\"\"\n{}\n\"\"\"\n",
        serde_json::to_string_pretty(&schema).unwrap_or_default(),
        transcript,
    )
}

/// Parse the model's response into a complete record.
///
/// Strict JSON parse of the full response; on failure, the first
/// `{`-to-last-`}` substring; on failure, an empty record.
pub fn parse_model_response(raw: &str) -> ExtractedFields {
    let mut fields = match serde_json::from_str::<ExtractedFields>(raw.trim()) {
        Ok(f) => f,
        Err(_) => match brace_substring(raw).and_then(|s| serde_json::from_str(s).ok()) {
            Some(f) => f,
            None => {
                warn!("Model response had no parsable JSON object; using empty record");
                ExtractedFields::default()
            }
        },
    };

    fields.expat = normalize_expat(&fields.expat);
    fields
}

/// First `{` to last `}` of the text, if such a span exists.
fn brace_substring(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Normalize expat to the strict "true"/"false"/"" domain.
///
/// Note the reconciler applies a stricter rule on top of this
/// (everything non-affirmative becomes "false").
pub fn normalize_expat(value: &str) -> String {
    let v = value.trim().to_lowercase();
    if EXPAT_AFFIRMATIVE.contains(&v.as_str()) {
        "true".to_string()
    } else if EXPAT_NEGATIVE.contains(&v.as_str()) {
        "false".to_string()
    } else {
        String::new()
    }
}
