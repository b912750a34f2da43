//! Controlled vocabularies for CRM fields.
//!
//! HubSpot rejects property values outside the configured option sets,
//! so free-text lead statuses and nationalities are mapped onto the
//! canonical labels here. Built once at startup and shared read-only.

use std::collections::HashMap;

/// Immutable lookup tables: lowercased input → canonical CRM label.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    lead_status: HashMap<&'static str, &'static str>,
    nationality: HashMap<&'static str, &'static str>,
}

impl Vocabulary {
    /// The vocabulary matching the production HubSpot portal.
    pub fn builtin() -> Self {
        let lead_status = HashMap::from([
            ("neu", "Neu"),
            ("in beratung", "In Beratung"),
            ("beratung", "In Beratung"),
            ("in bearbeitung", "In Bearbeitung"),
            ("termin vorgeschlagen", "Termin vorgeschlagen"),
            ("termin vereinbart", "Termin vereinbart"),
            ("kunde gewonnen", "Kunde gewonnen"),
            ("bestandskunde", "Bestandskunde"),
            ("kein interesse", "Kein Interesse"),
            ("falsche nummer", "Falsche Nummer ergänzen"),
            ("falsche nummer ergänzen", "Falsche Nummer ergänzen"),
            ("wiedervorlage", "Wiedervorlage"),
            ("bewerber", "Bewerber"),
            ("kooperationspartner", "Kooperationspartner"),
            ("beim setter", "Beim Setter"),
            ("altkontakt", "Altkontakt"),
        ]);

        let nationality = HashMap::from([
            ("indisch", "Indien"),
            ("india", "Indien"),
            ("indian", "Indien"),
            ("german", "Deutschland"),
            ("deutsch", "Deutschland"),
            ("deutschland", "Deutschland"),
            ("south africa", "Südafrika"),
            ("southafrica", "Südafrika"),
            ("südafrika", "Südafrika"),
        ]);

        Self {
            lead_status,
            nationality,
        }
    }

    /// Map a free-text lead status onto its canonical label.
    ///
    /// Lookup is case- and whitespace-insensitive. Unmapped values
    /// return `None` — the caller drops them from the payload.
    pub fn normalize_lead_status(&self, value: &str) -> Option<&'static str> {
        let key = value.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.lead_status.get(key.as_str()).copied()
    }

    /// Map a free-text nationality onto its canonical label.
    ///
    /// Unlike lead status, an unmapped non-empty value passes through
    /// unchanged — HubSpot's nationality field accepts free text.
    pub fn normalize_nationality(&self, value: &str) -> Option<String> {
        let key = value.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        match self.nationality.get(key.as_str()) {
            Some(canonical) => Some((*canonical).to_string()),
            None => Some(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_status_case_and_whitespace_insensitive() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.normalize_lead_status("  Neu "), Some("Neu"));
        assert_eq!(vocab.normalize_lead_status("neu"), Some("Neu"));
        assert_eq!(vocab.normalize_lead_status("IN BERATUNG"), Some("In Beratung"));
    }

    #[test]
    fn lead_status_aliases_map_to_same_label() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.normalize_lead_status("beratung"), Some("In Beratung"));
        assert_eq!(
            vocab.normalize_lead_status("falsche nummer"),
            Some("Falsche Nummer ergänzen")
        );
    }

    #[test]
    fn lead_status_unknown_is_none() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.normalize_lead_status("unknown status"), None);
        assert_eq!(vocab.normalize_lead_status(""), None);
        assert_eq!(vocab.normalize_lead_status("   "), None);
    }

    #[test]
    fn lead_status_output_is_always_canonical() {
        let vocab = Vocabulary::builtin();
        let canonical = [
            "Neu",
            "In Beratung",
            "In Bearbeitung",
            "Termin vorgeschlagen",
            "Termin vereinbart",
            "Kunde gewonnen",
            "Bestandskunde",
            "Kein Interesse",
            "Falsche Nummer ergänzen",
            "Wiedervorlage",
            "Bewerber",
            "Kooperationspartner",
            "Beim Setter",
            "Altkontakt",
        ];
        for input in ["neu", "Beratung", "beim setter", "ALTKONTAKT", "nonsense"] {
            if let Some(label) = vocab.normalize_lead_status(input) {
                assert!(canonical.contains(&label), "unexpected label {label}");
            }
        }
    }

    #[test]
    fn nationality_variants_map_to_canonical() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.normalize_nationality("india"), Some("Indien".into()));
        assert_eq!(vocab.normalize_nationality("Indian"), Some("Indien".into()));
        assert_eq!(vocab.normalize_nationality("indisch"), Some("Indien".into()));
        assert_eq!(
            vocab.normalize_nationality("south africa"),
            Some("Südafrika".into())
        );
    }

    #[test]
    fn nationality_unknown_passes_through_unchanged() {
        let vocab = Vocabulary::builtin();
        assert_eq!(
            vocab.normalize_nationality("Französisch"),
            Some("Französisch".into())
        );
    }

    #[test]
    fn nationality_empty_is_none() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.normalize_nationality(""), None);
        assert_eq!(vocab.normalize_nationality("  "), None);
    }
}
