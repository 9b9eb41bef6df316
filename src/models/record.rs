use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Accent, Facet};

/// Normalizes a queried word into its storage key.
///
/// Keys are trimmed, lowercased and have inner whitespace collapsed, so
/// `"  Hello  World "` and `"hello world"` identify the same word.
pub fn normalize_word(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Everything known about one word, as extracted from a dictionary page.
///
/// This is also the shape of the blob stored on the word row, so every field
/// defaults when absent to keep old snapshots readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordRecord {
    pub word: String,
    pub pronunciation: Pronunciations,
    pub definitions: Definitions,
    pub sentences: Vec<Sentence>,
    pub word_forms: Vec<WordForm>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pronunciations {
    pub american: Option<Pronunciation>,
    pub british: Option<Pronunciation>,
}

impl Pronunciations {
    pub fn get(&self, accent: Accent) -> Option<&Pronunciation> {
        match accent {
            Accent::American => self.american.as_ref(),
            Accent::British => self.british.as_ref(),
        }
    }

    pub fn set(&mut self, accent: Accent, value: Option<Pronunciation>) {
        match accent {
            Accent::American => self.american = value,
            Accent::British => self.british = value,
        }
    }

    /// Iterates over the accents that are present, in `Accent::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Accent, &Pronunciation)> {
        Accent::ALL
            .into_iter()
            .filter_map(|accent| self.get(accent).map(|p| (accent, p)))
    }

    pub fn is_empty(&self) -> bool {
        self.american.is_none() && self.british.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pronunciation {
    pub phonetic: String,
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Definitions {
    pub basic: Vec<BasicDefinition>,
    pub web: Vec<WebDefinition>,
    pub authoritative: Vec<AuthoritativeEntry>,
    pub bilingual: Vec<BilingualEntry>,
    pub english: Vec<EnglishEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicDefinition {
    pub part_of_speech: String,
    pub meaning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebDefinition {
    pub part_of_speech: Option<String>,
    pub meaning: String,
}

/// An english sentence paired with its chinese translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamplePair {
    pub english: String,
    pub chinese: String,
}

impl ExamplePair {
    pub fn new(english: impl Into<String>, chinese: impl Into<String>) -> Self {
        Self {
            english: english.into(),
            chinese: chinese.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.english.is_empty() && self.chinese.is_empty()
    }
}

/// A numbered sense with chinese and english glosses.
///
/// Shared by the authoritative and bilingual families.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SenseDefinition {
    pub number: u32,
    pub chinese_meaning: String,
    pub english_meaning: String,
    pub examples: Vec<ExamplePair>,
}

impl SenseDefinition {
    pub fn has_text(&self) -> bool {
        !self.chinese_meaning.is_empty() || !self.english_meaning.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Idiom {
    pub title: String,
    pub meaning: String,
    pub examples: Vec<ExamplePair>,
}

/// One part-of-speech block of the authoritative family.
///
/// Idioms stay nested here in the blob; the normalized store hangs them off
/// the first numbered definition row of the block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthoritativeEntry {
    pub part_of_speech: String,
    pub definitions: Vec<SenseDefinition>,
    pub idioms: Vec<Idiom>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BilingualEntry {
    pub part_of_speech: String,
    pub definitions: Vec<SenseDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnglishEntry {
    pub part_of_speech: String,
    pub definitions: Vec<EnglishDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnglishDefinition {
    pub number: u32,
    pub meaning: String,
    pub linked_words: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sentence {
    pub english: String,
    pub chinese: String,
    pub audio_url: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordForm {
    pub form_type: String,
    pub word: String,
}

impl WordRecord {
    /// Creates an empty record for the given word.
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }

    /// Whether the record carries usable data for `facet`.
    ///
    /// Empty strings and empty arrays count as absent, so a definition with
    /// no gloss text does not make its family present.
    pub fn has_facet(&self, facet: Facet) -> bool {
        let defs = &self.definitions;
        match facet {
            Facet::Pronunciation => self
                .pronunciation
                .iter()
                .any(|(_, p)| !p.phonetic.is_empty()),
            Facet::Basic => defs.basic.iter().any(|d| !d.meaning.is_empty()),
            Facet::Web => defs.web.iter().any(|d| !d.meaning.is_empty()),
            Facet::Authoritative => defs
                .authoritative
                .iter()
                .flat_map(|e| &e.definitions)
                .any(SenseDefinition::has_text),
            Facet::Bilingual => defs
                .bilingual
                .iter()
                .flat_map(|e| &e.definitions)
                .any(SenseDefinition::has_text),
            Facet::English => defs
                .english
                .iter()
                .flat_map(|e| &e.definitions)
                .any(|d| !d.meaning.is_empty()),
            Facet::Sentences => self
                .sentences
                .iter()
                .any(|s| !s.english.is_empty() || !s.chinese.is_empty()),
            Facet::WordForms => self.word_forms.iter().any(|f| !f.word.is_empty()),
        }
    }

    /// The set of facets this record carries data for.
    pub fn present_facets(&self) -> BTreeSet<Facet> {
        Facet::ALL
            .into_iter()
            .filter(|facet| self.has_facet(*facet))
            .collect()
    }

    /// Whether any core definition family (basic, authoritative, bilingual,
    /// english) has a usable entry.
    pub fn has_any_definition(&self) -> bool {
        Facet::ALL
            .into_iter()
            .filter(|f| f.is_core_definition())
            .any(|f| self.has_facet(f))
    }
}
