//! Upstream page retrieval wrapped around the extractor.
//!
//! [`Fetcher`] owns a [`PageSource`] and a [`RetryPolicy`]. Each attempt
//! downloads the page and runs [`extract`] on it, so a network failure is
//! retried while a page the extractor rejects is not.

mod client;
mod retry;

pub use client::{
    DEFAULT_LOCALE, DEFAULT_URL_TEMPLATE, FetchError, HttpPageSource, HttpPageSourceBuilder,
    PageSource,
};
pub use retry::{RetryPolicy, retry_with_policy, should_retry};

use crate::extractor::{Extraction, extract};
use crate::models::{DefinitionScope, normalize_word};

/// Fetches and extracts dictionary pages with retry.
pub struct Fetcher<S: PageSource> {
    source: S,
    policy: RetryPolicy,
}

impl<S: PageSource> Fetcher<S> {
    pub fn new(source: S) -> Self {
        Self::with_policy(source, RetryPolicy::default())
    }

    pub fn with_policy(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches `word` and extracts the facets requested by `scope`.
    ///
    /// The returned record is keyed by the normalized query, not by whatever
    /// headword the page shows, so that re-fetches always land on the same
    /// word row.
    pub fn fetch(&self, word: &str, scope: DefinitionScope) -> Result<Extraction, FetchError> {
        let key = normalize_word(word);
        if key.is_empty() {
            return Err(FetchError::InvalidUrl("empty word".to_string()));
        }

        let mut extraction = retry_with_policy(&self.policy, |attempt| {
            tracing::debug!(word = %key, attempt, "fetching page");
            let html = self.source.fetch_page(&key)?;
            Ok(extract(&html, scope)?)
        })?;

        if extraction.record.word != key && !extraction.record.word.is_empty() {
            tracing::debug!(
                query = %key,
                headword = %extraction.record.word,
                "page headword differs from query"
            );
        }
        extraction.record.word = key;
        Ok(extraction)
    }
}
