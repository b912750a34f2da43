//! Field Normalizer / Reconciler.
//!
//! Maps one [`ExtractedFields`] record onto the HubSpot property
//! schema. Pure function: no I/O, no retries, no partial application —
//! the only side effect is a diagnostic for dropped lead statuses.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::crm::vocab::Vocabulary;
use crate::extract::{EXPAT_AFFIRMATIVE, ExtractedFields};

/// HubSpot internal property names.
pub const PROP_JOBTITLE: &str = "jobtitle";
pub const PROP_NATIONALITY: &str = "nationalitat";
pub const PROP_EXPAT: &str = "expat";
pub const PROP_INTEREST: &str = "interesse";
pub const PROP_POT_UNITS: &str = "pot__einheiten";
pub const PROP_LEAD_STATUS: &str = "hs_lead_status";

/// Property patch for one contact. A key is present only if its source
/// value survived normalization; `expat` is always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContactUpdatePayload {
    properties: BTreeMap<&'static str, String>,
}

impl ContactUpdatePayload {
    pub fn properties(&self) -> &BTreeMap<&'static str, String> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn insert(&mut self, key: &'static str, value: String) {
        self.properties.insert(key, value);
    }
}

/// Build the contact property patch from extracted fields.
pub fn build_payload(fields: &ExtractedFields, vocab: &Vocabulary) -> ContactUpdatePayload {
    let mut payload = ContactUpdatePayload::default();

    let jobtitle = fields.jobtitle.trim();
    if !jobtitle.is_empty() {
        payload.insert(PROP_JOBTITLE, jobtitle.to_string());
    }

    if let Some(nationality) = vocab.normalize_nationality(&fields.nationality) {
        payload.insert(PROP_NATIONALITY, nationality);
    }

    // Always present: unset or unrecognized means "false" here, unlike
    // the extractor's unknown-means-empty policy.
    payload.insert(PROP_EXPAT, reconcile_expat(&fields.expat).to_string());

    let interest = fields.interested_products.trim();
    if !interest.is_empty() {
        payload.insert(PROP_INTEREST, interest.to_string());
    }

    let pot_units = fields.pot_einheiten.trim();
    if !pot_units.is_empty() {
        payload.insert(PROP_POT_UNITS, pot_units.to_string());
    }

    match vocab.normalize_lead_status(&fields.lead_status) {
        Some(status) => payload.insert(PROP_LEAD_STATUS, status.to_string()),
        None => {
            if !fields.lead_status.trim().is_empty() {
                warn!(lead_status = %fields.lead_status, "Lead status not mapped, skipping");
            }
        }
    }

    payload
}

/// The reconciler's expat rule: affirmative → "true", everything else
/// (including empty or absent) → "false". Never unset.
fn reconcile_expat(value: &str) -> &'static str {
    let v = value.trim().to_lowercase();
    if EXPAT_AFFIRMATIVE.contains(&v.as_str()) {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::builtin()
    }

    #[test]
    fn empty_fields_still_carry_expat() {
        let payload = build_payload(&ExtractedFields::default(), &vocab());
        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get(PROP_EXPAT), Some("false"));
    }

    #[test]
    fn expat_true_only_for_affirmative_set() {
        for v in ["true", "YES", " ja ", "1"] {
            let fields = ExtractedFields {
                expat: v.to_string(),
                ..Default::default()
            };
            let payload = build_payload(&fields, &vocab());
            assert_eq!(payload.get(PROP_EXPAT), Some("true"), "input {v:?}");
        }
        for v in ["false", "no", "nein", "0", "maybe", ""] {
            let fields = ExtractedFields {
                expat: v.to_string(),
                ..Default::default()
            };
            let payload = build_payload(&fields, &vocab());
            assert_eq!(payload.get(PROP_EXPAT), Some("false"), "input {v:?}");
        }
    }

    #[test]
    fn jobtitle_trimmed_passthrough() {
        let fields = ExtractedFields {
            jobtitle: "  Sales Manager  ".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &vocab());
        assert_eq!(payload.get(PROP_JOBTITLE), Some("Sales Manager"));
    }

    #[test]
    fn unmapped_lead_status_omitted_without_error() {
        let fields = ExtractedFields {
            lead_status: "unknown status".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &vocab());
        assert_eq!(payload.get(PROP_LEAD_STATUS), None);
    }

    #[test]
    fn lead_status_normalized_to_canonical_label() {
        let fields = ExtractedFields {
            lead_status: "  in beratung ".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &vocab());
        assert_eq!(payload.get(PROP_LEAD_STATUS), Some("In Beratung"));
    }

    #[test]
    fn unknown_nationality_passes_raw() {
        let fields = ExtractedFields {
            nationality: "Brasilianisch".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &vocab());
        assert_eq!(payload.get(PROP_NATIONALITY), Some("Brasilianisch"));
    }

    #[test]
    fn pot_einheiten_flows_through_when_present() {
        let fields = ExtractedFields {
            pot_einheiten: "12".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &vocab());
        assert_eq!(payload.get(PROP_POT_UNITS), Some("12"));
    }

    #[test]
    fn full_scenario_payload() {
        let fields = ExtractedFields {
            jobtitle: "Sales Manager".to_string(),
            nationality: "indian".to_string(),
            expat: "".to_string(),
            interested_products: "Fonds, ETF".to_string(),
            lead_status: "in Beratung".to_string(),
            pot_einheiten: String::new(),
        };
        let payload = build_payload(&fields, &vocab());
        assert_eq!(payload.get(PROP_JOBTITLE), Some("Sales Manager"));
        assert_eq!(payload.get(PROP_NATIONALITY), Some("Indien"));
        assert_eq!(payload.get(PROP_LEAD_STATUS), Some("In Beratung"));
        assert_eq!(payload.get(PROP_EXPAT), Some("false"));
        assert_eq!(payload.get(PROP_INTEREST), Some("Fonds, ETF"));
        assert_eq!(payload.get(PROP_POT_UNITS), None);
    }

    #[test]
    fn payload_serializes_as_flat_property_map() {
        let fields = ExtractedFields {
            jobtitle: "CTO".to_string(),
            ..Default::default()
        };
        let payload = build_payload(&fields, &vocab());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["jobtitle"], "CTO");
        assert_eq!(json["expat"], "false");
    }
}
