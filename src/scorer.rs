//! Completeness scoring for sanitized records.
//!
//! The only hard gate in the pipeline lives here: a record without a single
//! usable definition in any core family is not even partially valid and must
//! not be persisted. Everything else is advisory.

use serde::Serialize;

use crate::models::{Facet, WordRecord};

/// Three-valued completeness judgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Pronunciation and at least one definition family are present.
    Complete,
    /// At least one definition family is present; other facets are missing.
    PartiallyValid,
    /// No usable definitions at all.
    Invalid,
}

/// Result of scoring a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    pub is_complete: bool,
    pub is_partially_valid: bool,
    pub missing_fields: Vec<String>,
    pub issues: Vec<String>,
}

impl CompletenessReport {
    pub fn verdict(&self) -> Verdict {
        if self.is_complete {
            Verdict::Complete
        } else if self.is_partially_valid {
            Verdict::PartiallyValid
        } else {
            Verdict::Invalid
        }
    }

    /// Whether the record may be persisted.
    pub fn is_persistable(&self) -> bool {
        self.is_partially_valid
    }
}

/// Scores a sanitized record.
pub fn score(record: &WordRecord) -> CompletenessReport {
    let mut missing_fields = Vec::new();
    let mut issues = Vec::new();

    let has_phonetic = record.has_facet(Facet::Pronunciation);
    let has_definition = record.has_any_definition();

    if !has_phonetic {
        missing_fields.push("pronunciation".to_string());
        issues.push("missing pronunciation".to_string());
    } else {
        let without_audio = record
            .pronunciation
            .iter()
            .filter(|(_, p)| !p.phonetic.is_empty() && p.audio_url.is_none())
            .count();
        if without_audio > 0 {
            issues.push("missing pronunciation audio".to_string());
        }
    }

    if !has_definition {
        missing_fields.push("definitions".to_string());
        issues.push("no definitions in any family".to_string());
    }

    for facet in [
        Facet::Basic,
        Facet::Authoritative,
        Facet::Bilingual,
        Facet::English,
        Facet::Web,
    ] {
        if !record.has_facet(facet) {
            missing_fields.push(format!("definitions.{facet}"));
        }
    }
    if !record.has_facet(Facet::Web) {
        issues.push("missing web definitions".to_string());
    }

    let empty_senses = count_empty_senses(record);
    if empty_senses > 0 {
        issues.push(format!("{empty_senses} definition(s) without meaning text"));
    }

    if !record.has_facet(Facet::Sentences) {
        missing_fields.push("sentences".to_string());
        issues.push("missing example sentences".to_string());
    }

    if !record.has_facet(Facet::WordForms) {
        missing_fields.push("wordForms".to_string());
        issues.push("missing word forms".to_string());
    }

    CompletenessReport {
        is_complete: has_definition && has_phonetic,
        is_partially_valid: has_definition,
        missing_fields,
        issues,
    }
}

fn count_empty_senses(record: &WordRecord) -> usize {
    let defs = &record.definitions;
    defs.basic.iter().filter(|d| d.meaning.is_empty()).count()
        + defs.web.iter().filter(|d| d.meaning.is_empty()).count()
        + defs
            .authoritative
            .iter()
            .flat_map(|e| &e.definitions)
            .filter(|d| !d.has_text())
            .count()
        + defs
            .bilingual
            .iter()
            .flat_map(|e| &e.definitions)
            .filter(|d| !d.has_text())
            .count()
        + defs
            .english
            .iter()
            .flat_map(|e| &e.definitions)
            .filter(|d| d.meaning.is_empty())
            .count()
}
