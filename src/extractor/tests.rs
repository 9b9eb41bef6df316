use super::*;
use crate::models::Facet;

const QUICK: &str = include_str!("../../tests/fixtures/quick.html");
const HELLO_ALT: &str = include_str!("../../tests/fixtures/hello_alt.html");
const NOT_FOUND: &str = include_str!("../../tests/fixtures/not_found.html");

#[test]
fn blank_document_is_an_error() {
    assert_eq!(
        extract("  \n ", DefinitionScope::All),
        Err(ExtractError::EmptyDocument)
    );
}

#[test]
fn full_page_yields_every_facet() {
    let extraction = extract(QUICK, DefinitionScope::All).unwrap();
    let record = &extraction.record;

    assert_eq!(record.word, "quick");
    assert_eq!(record.present_facets().len(), Facet::ALL.len());
    assert!(extraction.soft_issues.is_empty(), "{:?}", extraction.soft_issues);
}

#[test]
fn full_page_pronunciation() {
    let record = extract(QUICK, DefinitionScope::All).unwrap().record;

    let us = record.pronunciation.american.unwrap();
    assert_eq!(us.phonetic, "[kwɪk]");
    assert_eq!(
        us.audio_url.as_deref(),
        Some("https://dict.example.com/media/quick-us.mp3")
    );
    assert!(record.pronunciation.british.is_some());
}

#[test]
fn full_page_basic_and_web() {
    let record = extract(QUICK, DefinitionScope::All).unwrap().record;

    let basic = &record.definitions.basic;
    assert_eq!(basic.len(), 3);
    assert_eq!(basic[0].part_of_speech, "adj.");
    assert_eq!(basic[0].meaning, "快的；迅速的；敏捷的；急躁的");
    assert_eq!(basic[2].part_of_speech, "n.");

    let web: Vec<&str> = record
        .definitions
        .web
        .iter()
        .map(|w| w.meaning.as_str())
        .collect();
    assert_eq!(web, vec!["快速", "快速的", "迅速"]);
}

#[test]
fn authoritative_splits_definitions_from_idioms() {
    let record = extract(QUICK, DefinitionScope::All).unwrap().record;
    let auth = &record.definitions.authoritative;

    assert_eq!(auth.len(), 2);
    let adj = &auth[0];
    assert_eq!(adj.part_of_speech, "adj.");
    assert_eq!(adj.definitions.len(), 2);
    assert_eq!(adj.definitions[0].number, 1);
    assert_eq!(adj.definitions[0].chinese_meaning, "快的；迅速的");
    assert_eq!(adj.definitions[0].examples.len(), 2);
    assert_eq!(adj.definitions[1].examples.len(), 1);

    assert_eq!(adj.idioms.len(), 2);
    assert_eq!(adj.idioms[0].title, "quick on the draw");
    assert_eq!(adj.idioms[0].examples.len(), 1);
    assert_eq!(adj.idioms[1].title, "(as) quick as a flash");
    assert_eq!(adj.idioms[1].examples.len(), 2);

    assert_eq!(auth[1].part_of_speech, "adv.");
    assert!(auth[1].idioms.is_empty());
}

#[test]
fn bilingual_english_sentences_and_forms() {
    let record = extract(QUICK, DefinitionScope::All).unwrap().record;

    let bilingual = &record.definitions.bilingual[0].definitions[0];
    assert_eq!(bilingual.english_meaning, "fast");
    assert_eq!(bilingual.examples[0].english, "a quick reply");

    let english = &record.definitions.english[0].definitions[0];
    assert_eq!(english.linked_words, vec!["fast", "rapid"]);

    assert_eq!(record.sentences.len(), 2);
    assert_eq!(record.sentences[0].source.as_deref(), Some("dict.example.com"));
    assert_eq!(record.sentences[1].audio_url, None);

    assert_eq!(record.word_forms.len(), 2);
    assert_eq!(record.word_forms[1].form_type, "最高级");
    assert_eq!(record.word_forms[1].word, "quickest");
}

#[test]
fn scope_limits_tabbed_families_only() {
    let record = extract(QUICK, DefinitionScope::English).unwrap().record;

    assert!(record.definitions.authoritative.is_empty());
    assert!(record.definitions.bilingual.is_empty());
    assert!(!record.definitions.english.is_empty());
    assert!(!record.definitions.basic.is_empty());
    assert!(!record.sentences.is_empty());
}

#[test]
fn alternate_markup_is_read_through_fallbacks() {
    let extraction = extract(HELLO_ALT, DefinitionScope::All).unwrap();
    let record = &extraction.record;

    assert_eq!(record.word, "hello");
    assert_eq!(
        record.pronunciation.american.as_ref().unwrap().phonetic,
        "[həˈloʊ]"
    );
    assert_eq!(record.definitions.basic.len(), 1);
    assert_eq!(record.definitions.basic[0].part_of_speech, "int.");
    assert!(record.sentences.is_empty());
    assert!(
        extraction
            .soft_issues
            .iter()
            .any(|i| i.starts_with("no sentences found"))
    );
}

#[test]
fn page_without_entry_yields_empty_record_not_error() {
    let extraction = extract(NOT_FOUND, DefinitionScope::All).unwrap();

    assert!(extraction.record.present_facets().is_empty());
    assert_eq!(extraction.record.word, "");
    assert_eq!(extraction.soft_issues.len(), 8);
}
