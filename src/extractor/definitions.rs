//! Definition families.
//!
//! Basic and web definitions come from the quick-definition list at the top of
//! the page. The authoritative, bilingual and english families each live in
//! their own tab, split into part-of-speech segments of numbered items.

use scraper::ElementRef;

use super::idioms::extract_idioms;
use super::strategy::StrategyChain;
use super::text::{element_text, first_text, has_class, parse_number, select_all, select_first};
use crate::models::{
    AuthoritativeEntry, BasicDefinition, BilingualEntry, EnglishDefinition, EnglishEntry,
    ExamplePair, SenseDefinition, WebDefinition,
};

const WEB_LABEL: &str = "网络";

pub fn basic_chain() -> StrategyChain<Vec<BasicDefinition>> {
    StrategyChain::new("basic definitions")
        .then("quick definitions", |root| basic_from_list(root, ".qdef ul li"))
        .then("basic list", |root| basic_from_list(root, "ul.basic-defs li"))
}

pub fn web_chain() -> StrategyChain<Vec<WebDefinition>> {
    StrategyChain::new("web definitions")
        .then("quick definitions", |root| web_from_list(root, ".qdef ul li"))
        .then("web list", |root| {
            select_all(root, "ul.web-defs li")
                .into_iter()
                .map(|li| WebDefinition {
                    part_of_speech: None,
                    meaning: element_text(li),
                })
                .collect()
        })
}

pub fn authoritative_chain() -> StrategyChain<Vec<AuthoritativeEntry>> {
    StrategyChain::new("authoritative definitions")
        .then("auth tab", |root| authoritative_in(root, "#authid"))
        .then("auth panel", |root| authoritative_in(root, "div.authoritative"))
}

pub fn bilingual_chain() -> StrategyChain<Vec<BilingualEntry>> {
    StrategyChain::new("bilingual definitions")
        .then("cross tab", |root| bilingual_in(root, "#crossid"))
        .then("bilingual panel", |root| bilingual_in(root, "div.bilingual"))
}

pub fn english_chain() -> StrategyChain<Vec<EnglishEntry>> {
    StrategyChain::new("english definitions")
        .then("homo tab", |root| english_in(root, "#homoid"))
        .then("english panel", |root| english_in(root, "div.english-defs"))
}

fn is_web_item(li: ElementRef<'_>) -> bool {
    select_first(li, ".pos").is_some_and(|pos| has_class(pos, "web") || element_text(pos) == WEB_LABEL)
}

fn basic_from_list(root: ElementRef<'_>, css: &str) -> Vec<BasicDefinition> {
    select_all(root, css)
        .into_iter()
        .filter(|li| !is_web_item(*li))
        .map(|li| BasicDefinition {
            part_of_speech: first_text(li, ".pos"),
            meaning: first_text(li, ".def"),
        })
        .filter(|d| !d.meaning.is_empty())
        .collect()
}

fn web_from_list(root: ElementRef<'_>, css: &str) -> Vec<WebDefinition> {
    select_all(root, css)
        .into_iter()
        .filter(|li| is_web_item(*li))
        .flat_map(|li| {
            // Web glosses are a single `；`-separated run.
            first_text(li, ".def")
                .split('；')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| WebDefinition {
                    part_of_speech: None,
                    meaning: s.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Part-of-speech segments inside a tab container.
fn segments<'a>(root: ElementRef<'a>, container_css: &str) -> Vec<ElementRef<'a>> {
    let Some(container) = select_first(root, container_css) else {
        return Vec::new();
    };
    let segments = select_all(container, ".segment");
    if segments.is_empty() {
        select_all(container, ".each_seg")
    } else {
        segments
    }
}

fn examples_in(item: ElementRef<'_>) -> Vec<ExamplePair> {
    select_all(item, ".li_ex")
        .into_iter()
        .map(|ex| ExamplePair::new(first_text(ex, ".ex_en"), first_text(ex, ".ex_cn")))
        .collect()
}

fn sense_items(segment: ElementRef<'_>) -> Vec<SenseDefinition> {
    select_all(segment, ".def_item")
        .into_iter()
        .enumerate()
        .map(|(index, item)| SenseDefinition {
            number: parse_number(&first_text(item, ".def_num")).unwrap_or(index as u32 + 1),
            chinese_meaning: first_text(item, ".def_cn"),
            english_meaning: first_text(item, ".def_en"),
            examples: examples_in(item),
        })
        .collect()
}

fn authoritative_in(root: ElementRef<'_>, container_css: &str) -> Vec<AuthoritativeEntry> {
    segments(root, container_css)
        .into_iter()
        .map(|segment| AuthoritativeEntry {
            part_of_speech: first_text(segment, ".pos"),
            definitions: sense_items(segment),
            idioms: select_first(segment, ".idm_block")
                .map(extract_idioms)
                .unwrap_or_default(),
        })
        .filter(|entry| !entry.definitions.is_empty() || !entry.idioms.is_empty())
        .collect()
}

fn bilingual_in(root: ElementRef<'_>, container_css: &str) -> Vec<BilingualEntry> {
    segments(root, container_css)
        .into_iter()
        .map(|segment| BilingualEntry {
            part_of_speech: first_text(segment, ".pos"),
            definitions: sense_items(segment),
        })
        .filter(|entry| !entry.definitions.is_empty())
        .collect()
}

fn english_in(root: ElementRef<'_>, container_css: &str) -> Vec<EnglishEntry> {
    segments(root, container_css)
        .into_iter()
        .map(|segment| EnglishEntry {
            part_of_speech: first_text(segment, ".pos"),
            definitions: select_all(segment, ".def_item")
                .into_iter()
                .enumerate()
                .map(|(index, item)| EnglishDefinition {
                    number: parse_number(&first_text(item, ".def_num"))
                        .unwrap_or(index as u32 + 1),
                    meaning: first_text(item, ".def_en"),
                    linked_words: select_all(item, "a.linked")
                        .into_iter()
                        .map(element_text)
                        .collect(),
                })
                .collect(),
        })
        .filter(|entry| !entry.definitions.is_empty())
        .collect()
}
