//! HTML → [`WordRecord`] extraction.
//!
//! Every facet is read independently through its own [`StrategyChain`]; a
//! missing fragment produces an empty facet and a soft issue, never an error.
//! No network or storage access happens here.

mod definitions;
mod idioms;
mod pronunciation;
mod sentences;
mod strategy;
mod text;
mod word_forms;

#[cfg(test)]
mod tests;

use scraper::{ElementRef, Html};
use thiserror::Error;

pub use strategy::{ChainOutcome, FacetValue, Strategy, StrategyChain};

use crate::models::{DefinitionScope, WordRecord};

/// Hard extraction failures.
///
/// Only a document with nothing to parse is an error; everything else
/// degrades to empty facets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("document is empty")]
    EmptyDocument,
}

/// A record plus the soft issues found while reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub record: WordRecord,
    pub soft_issues: Vec<String>,
}

/// Extracts every facet requested by `scope` from a dictionary page.
pub fn extract(html: &str, scope: DefinitionScope) -> Result<Extraction, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }

    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let mut issues = Vec::new();

    let mut record = WordRecord::new(headword(root));
    record.pronunciation = run(&pronunciation::chain(), root, &mut issues);
    record.definitions.basic = run(&definitions::basic_chain(), root, &mut issues);
    record.definitions.web = run(&definitions::web_chain(), root, &mut issues);
    if scope.includes_authoritative() {
        record.definitions.authoritative =
            run(&definitions::authoritative_chain(), root, &mut issues);
    }
    if scope.includes_bilingual() {
        record.definitions.bilingual = run(&definitions::bilingual_chain(), root, &mut issues);
    }
    if scope.includes_english() {
        record.definitions.english = run(&definitions::english_chain(), root, &mut issues);
    }
    record.sentences = run(&sentences::chain(), root, &mut issues);
    record.word_forms = run(&word_forms::chain(), root, &mut issues);

    Ok(Extraction {
        record,
        soft_issues: issues,
    })
}

fn run<T: FacetValue>(
    chain: &StrategyChain<T>,
    root: ElementRef<'_>,
    issues: &mut Vec<String>,
) -> T {
    let outcome = chain.run(root);
    if outcome.matched.is_none() {
        let issue = format!(
            "no {} found (tried: {})",
            chain.facet(),
            chain.strategy_names().join(", ")
        );
        tracing::debug!(facet = chain.facet(), "{issue}");
        issues.push(issue);
    }
    outcome.value
}

fn headword(root: ElementRef<'_>) -> String {
    let chain: StrategyChain<String> = StrategyChain::new("headword")
        .then("headword block", |root| text::first_text(root, "#headword h1"))
        .then("headword heading", |root| text::first_text(root, "h1.headword"));
    chain.run(root).value
}
