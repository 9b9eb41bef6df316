//! Whitespace and URL normalization for extracted records.
//!
//! Every string leaf is trimmed and has internal whitespace runs collapsed to
//! a single space; an empty result means "absent". URL leaves must carry an
//! `http` scheme. Leaf containers that end up empty are dropped, but
//! definitions are left alone so the scorer can judge them. Sanitizing is
//! idempotent.

use std::collections::BTreeSet;

use crate::models::{
    Accent, AuthoritativeEntry, BasicDefinition, BilingualEntry, EnglishDefinition, EnglishEntry,
    ExamplePair, Facet, Idiom, Pronunciation, Sentence, SenseDefinition, WebDefinition, WordForm,
    WordRecord,
};

/// Trims and collapses whitespace. Returns an empty string for blank input.
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Like [`clean_text`] but maps blank input to `None`.
pub fn clean_optional(value: Option<&str>) -> Option<String> {
    value.map(clean_text).filter(|s| !s.is_empty())
}

/// Trims a URL and keeps it only if it uses an `http`/`https` scheme.
pub fn clean_url(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    let has_scheme = trimmed.len() > 4
        && trimmed
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"));
    if has_scheme && !trimmed.contains(char::is_whitespace) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

fn clean_examples(examples: &[ExamplePair]) -> Vec<ExamplePair> {
    examples
        .iter()
        .map(|e| ExamplePair::new(clean_text(&e.english), clean_text(&e.chinese)))
        .filter(|e| !e.is_empty())
        .collect()
}

fn clean_sense(sense: &SenseDefinition) -> SenseDefinition {
    SenseDefinition {
        number: sense.number,
        chinese_meaning: clean_text(&sense.chinese_meaning),
        english_meaning: clean_text(&sense.english_meaning),
        examples: clean_examples(&sense.examples),
    }
}

fn clean_pronunciation(value: Option<&Pronunciation>) -> Option<Pronunciation> {
    let p = value?;
    let cleaned = Pronunciation {
        phonetic: clean_text(&p.phonetic),
        audio_url: clean_url(p.audio_url.as_deref()),
    };
    if cleaned.phonetic.is_empty() && cleaned.audio_url.is_none() {
        None
    } else {
        Some(cleaned)
    }
}

/// Returns a sanitized copy of `record`.
pub fn sanitize(record: &WordRecord) -> WordRecord {
    let mut out = WordRecord::new(clean_text(&record.word));

    for accent in Accent::ALL {
        out.pronunciation
            .set(accent, clean_pronunciation(record.pronunciation.get(accent)));
    }

    let defs = &record.definitions;
    out.definitions.basic = defs
        .basic
        .iter()
        .map(|d| BasicDefinition {
            part_of_speech: clean_text(&d.part_of_speech),
            meaning: clean_text(&d.meaning),
        })
        .collect();

    out.definitions.web = defs
        .web
        .iter()
        .map(|d| WebDefinition {
            part_of_speech: clean_optional(d.part_of_speech.as_deref()),
            meaning: clean_text(&d.meaning),
        })
        .collect();

    out.definitions.authoritative = defs
        .authoritative
        .iter()
        .map(|entry| AuthoritativeEntry {
            part_of_speech: clean_text(&entry.part_of_speech),
            definitions: entry.definitions.iter().map(clean_sense).collect(),
            idioms: entry
                .idioms
                .iter()
                .map(|idiom| Idiom {
                    title: clean_text(&idiom.title),
                    meaning: clean_text(&idiom.meaning),
                    examples: clean_examples(&idiom.examples),
                })
                .filter(|idiom| !idiom.title.is_empty())
                .collect(),
        })
        .collect();

    out.definitions.bilingual = defs
        .bilingual
        .iter()
        .map(|entry| BilingualEntry {
            part_of_speech: clean_text(&entry.part_of_speech),
            definitions: entry.definitions.iter().map(clean_sense).collect(),
        })
        .collect();

    out.definitions.english = defs
        .english
        .iter()
        .map(|entry| EnglishEntry {
            part_of_speech: clean_text(&entry.part_of_speech),
            definitions: entry
                .definitions
                .iter()
                .map(|d| EnglishDefinition {
                    number: d.number,
                    meaning: clean_text(&d.meaning),
                    linked_words: d
                        .linked_words
                        .iter()
                        .map(|w| clean_text(w))
                        .filter(|w| !w.is_empty())
                        .collect(),
                })
                .collect(),
        })
        .collect();

    out.sentences = record
        .sentences
        .iter()
        .map(|s| Sentence {
            english: clean_text(&s.english),
            chinese: clean_text(&s.chinese),
            audio_url: clean_url(s.audio_url.as_deref()),
            source: clean_optional(s.source.as_deref()),
        })
        .filter(|s| !s.english.is_empty() || !s.chinese.is_empty())
        .collect();

    out.word_forms = record
        .word_forms
        .iter()
        .map(|f| WordForm {
            form_type: clean_text(&f.form_type),
            word: clean_text(&f.word),
        })
        .filter(|f| !f.word.is_empty())
        .collect();

    out
}

/// Facets that are non-empty after sanitizing.
pub fn non_empty_facets(record: &WordRecord) -> BTreeSet<Facet> {
    record.present_facets()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messy_record() -> WordRecord {
        let mut record = WordRecord::new("  Quick\n");
        record.pronunciation.american = Some(Pronunciation {
            phonetic: "  [kwɪk]\t".into(),
            audio_url: Some("  https://example.com/us.mp3 ".into()),
        });
        record.pronunciation.british = Some(Pronunciation {
            phonetic: "   ".into(),
            audio_url: Some("javascript:void(0)".into()),
        });
        record.definitions.basic.push(BasicDefinition {
            part_of_speech: " adj. ".into(),
            meaning: "快的；\n   迅速的".into(),
        });
        record.definitions.web.push(WebDefinition {
            part_of_speech: Some("  ".into()),
            meaning: "快速".into(),
        });
        record.definitions.authoritative.push(AuthoritativeEntry {
            part_of_speech: "adj.".into(),
            definitions: vec![SenseDefinition {
                number: 1,
                chinese_meaning: " 快的 ".into(),
                english_meaning: "".into(),
                examples: vec![
                    ExamplePair::new("  a quick  walk ", "快步走"),
                    ExamplePair::new(" ", "\n"),
                ],
            }],
            idioms: vec![Idiom {
                title: "   ".into(),
                meaning: "dropped".into(),
                examples: Vec::new(),
            }],
        });
        record.definitions.english.push(EnglishEntry {
            part_of_speech: "adj.".into(),
            definitions: vec![EnglishDefinition {
                number: 1,
                meaning: "moving  fast".into(),
                linked_words: vec!["fast".into(), "  ".into()],
            }],
        });
        record.sentences.push(Sentence {
            english: "".into(),
            chinese: "  ".into(),
            audio_url: None,
            source: None,
        });
        record.sentences.push(Sentence {
            english: "Be  quick!".into(),
            chinese: "快点！".into(),
            audio_url: Some("ftp://example.com/s.mp3".into()),
            source: Some("  ".into()),
        });
        record.word_forms.push(WordForm {
            form_type: "比较级：".into(),
            word: "".into(),
        });
        record
    }

    #[test]
    fn collapses_whitespace_in_every_leaf() {
        let clean = sanitize(&messy_record());

        assert_eq!(clean.word, "Quick");
        assert_eq!(clean.definitions.basic[0].part_of_speech, "adj.");
        assert_eq!(clean.definitions.basic[0].meaning, "快的； 迅速的");
        assert_eq!(clean.definitions.english[0].definitions[0].meaning, "moving fast");
        assert_eq!(
            clean.definitions.authoritative[0].definitions[0].examples[0].english,
            "a quick walk"
        );
    }

    #[test]
    fn drops_empty_leaves_and_bad_urls() {
        let clean = sanitize(&messy_record());

        let us = clean.pronunciation.american.as_ref().unwrap();
        assert_eq!(us.phonetic, "[kwɪk]");
        assert_eq!(us.audio_url.as_deref(), Some("https://example.com/us.mp3"));
        assert!(clean.pronunciation.british.is_none());

        assert_eq!(clean.definitions.web[0].part_of_speech, None);
        assert_eq!(clean.definitions.authoritative[0].definitions[0].examples.len(), 1);
        assert!(clean.definitions.authoritative[0].idioms.is_empty());
        assert_eq!(clean.definitions.english[0].definitions[0].linked_words, vec!["fast"]);

        assert_eq!(clean.sentences.len(), 1);
        assert_eq!(clean.sentences[0].audio_url, None);
        assert_eq!(clean.sentences[0].source, None);
        assert!(clean.word_forms.is_empty());
    }

    #[test]
    fn keeps_definitions_with_empty_meaning() {
        let mut record = WordRecord::new("x");
        record.definitions.basic.push(BasicDefinition {
            part_of_speech: "n.".into(),
            meaning: "   ".into(),
        });

        let clean = sanitize(&record);

        assert_eq!(clean.definitions.basic.len(), 1);
        assert_eq!(clean.definitions.basic[0].meaning, "");
    }

    #[test]
    fn sanitizing_twice_is_a_fixed_point() {
        let once = sanitize(&messy_record());
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn reports_non_empty_facets() {
        let clean = sanitize(&messy_record());
        let facets = non_empty_facets(&clean);

        assert!(facets.contains(&Facet::Pronunciation));
        assert!(facets.contains(&Facet::Basic));
        assert!(facets.contains(&Facet::Web));
        assert!(facets.contains(&Facet::Authoritative));
        assert!(facets.contains(&Facet::English));
        assert!(facets.contains(&Facet::Sentences));
        assert!(!facets.contains(&Facet::Bilingual));
        assert!(!facets.contains(&Facet::WordForms));
    }

    #[test]
    fn clean_url_requires_http_scheme() {
        assert_eq!(
            clean_url(Some(" HTTP://a.b/c ")).as_deref(),
            Some("HTTP://a.b/c")
        );
        assert_eq!(clean_url(Some("//cdn.example.com/a.mp3")), None);
        assert_eq!(clean_url(Some("http")), None);
        assert_eq!(clean_url(None), None);
    }
}
