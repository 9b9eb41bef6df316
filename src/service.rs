use serde::Serialize;

use crate::db::Database;
use crate::error::PipelineError;
use crate::fetcher::{Fetcher, PageSource};
use crate::models::{DefinitionScope, WordId, WordRecord, normalize_word};
use crate::persister::{DualWriteOutcome, Persister};
use crate::sanitizer::sanitize;
use crate::scorer::{CompletenessReport, score};

/// Result of one fetch → sanitize → score → persist run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub record: WordRecord,
    pub report: CompletenessReport,
    pub write: DualWriteOutcome,
    /// Fragments the extractor could not find; informational only.
    pub soft_issues: Vec<String>,
}

/// A stored blob together with its current completeness score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedEntry {
    pub word_id: WordId,
    pub record: WordRecord,
    pub report: CompletenessReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    /// Served from the stored blob without a network call.
    Cache,
    /// Fetched from upstream and persisted.
    Upstream,
    /// Upstream failed; served an incomplete stored blob instead.
    StaleCache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub record: WordRecord,
    pub report: CompletenessReport,
    pub source: LookupSource,
}

/// Service layer the HTTP collaborator calls.
///
/// DictionaryService owns a Database and a [`Fetcher`] and runs the ingest
/// pipeline end to end. It is UI-independent; the CLI uses the same methods.
///
/// # Examples
///
/// ```
/// use wordbank::{Database, DictionaryService, FetchError, Fetcher, PageSource};
///
/// struct Offline;
///
/// impl PageSource for Offline {
///     fn fetch_page(&self, _word: &str) -> Result<String, FetchError> {
///         Err(FetchError::Http { status: 404 })
///     }
/// }
///
/// # fn main() -> anyhow::Result<()> {
/// let service = DictionaryService::new(Database::in_memory()?, Fetcher::new(Offline));
/// assert!(service.read_cached("quick")?.is_none());
/// # Ok(())
/// # }
/// ```
pub struct DictionaryService<S: PageSource> {
    db: Database,
    fetcher: Fetcher<S>,
}

impl<S: PageSource> DictionaryService<S> {
    pub fn new(db: Database, fetcher: Fetcher<S>) -> Self {
        Self { db, fetcher }
    }

    /// Returns a reference to the underlying database.
    ///
    /// Used by the audit, repair and migration tooling, which operate on the
    /// store directly.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn fetcher(&self) -> &Fetcher<S> {
        &self.fetcher
    }

    /// Fetches `word`, gates it on completeness and writes both
    /// representations.
    ///
    /// Facet write failures do not fail the call; they are returned in
    /// [`IngestOutcome::write`].
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Fetch`] when the page cannot be retrieved or parsed
    /// - [`PipelineError::ValidationRejected`] when the record has no
    ///   definitions; nothing is written
    /// - [`PipelineError::Identity`] when the word row cannot be written
    pub fn fetch_and_persist(
        &self,
        word: &str,
        scope: DefinitionScope,
    ) -> Result<IngestOutcome, PipelineError> {
        let extraction = self.fetcher.fetch(word, scope)?;
        for issue in &extraction.soft_issues {
            tracing::debug!(word = %extraction.record.word, %issue, "soft extraction issue");
        }

        let record = sanitize(&extraction.record);
        let report = score(&record);
        if !report.is_persistable() {
            tracing::info!(word = %record.word, missing = ?report.missing_fields, "record rejected");
            return Err(PipelineError::ValidationRejected {
                word: record.word,
                report,
            });
        }

        let persister = Persister::new(&self.db);
        let word_id = persister
            .upsert_word(&record)
            .map_err(|source| PipelineError::Identity {
                word: record.word.clone(),
                source,
            })?;
        let facets = persister.persist_facets(word_id, &record, &crate::models::Facet::ALL);

        tracing::info!(
            word = %record.word,
            %word_id,
            verdict = ?report.verdict(),
            written = facets.written.len(),
            failed = facets.facet_failures.len(),
            "word persisted"
        );

        Ok(IngestOutcome {
            write: DualWriteOutcome {
                word_id,
                written: facets.written,
                facet_failures: facets.facet_failures,
            },
            record,
            report,
            soft_issues: extraction.soft_issues,
        })
    }

    /// Reads the stored blob for `word` and scores it. No network access.
    pub fn read_cached(&self, word: &str) -> Result<Option<CachedEntry>, PipelineError> {
        read_cached(&self.db, word)
    }

    /// Cache-first read.
    ///
    /// Serves the stored blob when it scores complete. Otherwise re-fetches
    /// and persists; if that fails and an incomplete but partially valid
    /// blob exists, serves it as [`LookupSource::StaleCache`].
    pub fn lookup(&self, word: &str, scope: DefinitionScope) -> Result<Lookup, PipelineError> {
        let cached = self.read_cached(word)?;
        if let Some(entry) = &cached
            && entry.report.is_complete
        {
            return Ok(Lookup {
                record: entry.record.clone(),
                report: entry.report.clone(),
                source: LookupSource::Cache,
            });
        }

        match self.fetch_and_persist(word, scope) {
            Ok(outcome) => Ok(Lookup {
                record: outcome.record,
                report: outcome.report,
                source: LookupSource::Upstream,
            }),
            Err(e) => match cached {
                Some(entry) if entry.report.is_partially_valid => {
                    tracing::warn!(word = %entry.record.word, error = %e, "re-fetch failed, serving stored entry");
                    Ok(Lookup {
                        record: entry.record,
                        report: entry.report,
                        source: LookupSource::StaleCache,
                    })
                }
                _ => Err(e),
            },
        }
    }
}

/// Reads and scores the stored blob for `word` straight from `db`.
///
/// The same read as [`DictionaryService::read_cached`], for callers that
/// have no page source.
pub fn read_cached(db: &Database, word: &str) -> Result<Option<CachedEntry>, PipelineError> {
    let persister = Persister::new(db);
    let key = normalize_word(word);
    let Some(word_id) = persister.find_word(&key).map_err(PipelineError::Storage)? else {
        return Ok(None);
    };
    let Some(blob) = persister
        .read_blob_by_id(word_id)
        .map_err(PipelineError::Storage)?
    else {
        return Ok(None);
    };

    let record = sanitize(&blob);
    let report = score(&record);
    Ok(Some(CachedEntry {
        word_id,
        record,
        report,
    }))
}
