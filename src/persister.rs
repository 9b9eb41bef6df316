//! Dual-write persistence: the blob snapshot and the normalized rows.
//!
//! Step 1 upserts the word row and its blob in its own transaction and must
//! succeed. Step 2 writes each facet's rows inside one transaction, with a
//! savepoint per facet so that one failing facet is rolled back and recorded
//! while the others are kept.

pub mod facets;


use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::db::{Database, in_savepoint, in_transaction};
use crate::models::{Facet, WordId, WordRecord, normalize_word};
use crate::utils::now_unix;

/// A facet whose rows could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetFailure {
    pub facet: Facet,
    pub message: String,
}

/// Result of Step 2 for one word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetWriteReport {
    /// Facets whose rows were written (possibly as an empty set).
    pub written: BTreeSet<Facet>,
    pub facet_failures: Vec<FacetFailure>,
    /// Rows touched across all written facets, children included.
    pub rows: usize,
}

impl FacetWriteReport {
    pub fn is_clean(&self) -> bool {
        self.facet_failures.is_empty()
    }
}

/// Result of a full dual write.
///
/// Reaching this value means the word and blob are stored. Facet failures
/// are conditions to surface, not a failed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DualWriteOutcome {
    pub word_id: WordId,
    pub written: BTreeSet<Facet>,
    pub facet_failures: Vec<FacetFailure>,
}

/// Writes records into a [`Database`].
pub struct Persister<'a> {
    db: &'a Database,
    conn: &'a Connection,
}

impl<'a> Persister<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            conn: db.connection(),
        }
    }

    /// Runs both steps for a sanitized record.
    ///
    /// # Errors
    ///
    /// Returns an error only when Step 1 fails. Once the word and blob are
    /// committed, every Step 2 problem is reported as a facet failure.
    pub fn persist(&self, record: &WordRecord) -> Result<DualWriteOutcome> {
        let word_id = self.upsert_word(record)?;
        let report = self.persist_facets(word_id, record, &Facet::ALL);

        Ok(DualWriteOutcome {
            word_id,
            written: report.written,
            facet_failures: report.facet_failures,
        })
    }

    /// Step 1: creates or updates the word row and stores the blob.
    pub fn upsert_word(&self, record: &WordRecord) -> Result<WordId> {
        let key = normalize_word(&record.word);
        if key.is_empty() {
            anyhow::bail!("record has no word");
        }
        let blob = serde_json::to_string(record).context("Failed to serialize blob")?;
        let now = now_unix();

        in_transaction(self.conn, || {
            let id: i64 = self.db.bounded(|| {
                self.conn
                    .query_row(
                        "INSERT INTO words (word_text, blob, blob_updated_at, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?3, ?3)
                         ON CONFLICT(word_text) DO UPDATE SET
                             blob = excluded.blob,
                             blob_updated_at = excluded.blob_updated_at,
                             updated_at = excluded.updated_at
                         RETURNING id",
                        params![key, blob, now],
                        |row| row.get(0),
                    )
                    .with_context(|| format!("Failed to upsert word '{key}'"))
            })?;
            Ok(WordId::new(id))
        })
    }

    /// Step 2 for a subset of facets.
    ///
    /// Used directly by backfill and migration, which only rewrite the facets
    /// the tables are missing. If the enclosing transaction cannot be opened
    /// or committed, nothing is written and every requested facet is
    /// reported as failed with that cause.
    pub fn persist_facets(
        &self,
        word_id: WordId,
        record: &WordRecord,
        facets: &[Facet],
    ) -> FacetWriteReport {
        let now = now_unix();

        let result = in_transaction(self.conn, || {
            let mut report = FacetWriteReport::default();
            for &facet in facets {
                let savepoint = format!("facet_{}", facet.as_str());
                match in_savepoint(self.conn, &savepoint, || {
                    self.db
                        .bounded(|| facets::write_facet(self.conn, word_id, record, facet, now))
                }) {
                    Ok(rows) => {
                        report.written.insert(facet);
                        report.rows += rows;
                    }
                    Err(e) => {
                        let message = format!("{e:#}");
                        tracing::warn!(word_id = %word_id, %facet, error = %message, "facet write failed");
                        report.facet_failures.push(FacetFailure { facet, message });
                    }
                }
            }
            Ok(report)
        });

        result.unwrap_or_else(|e| {
            let message = format!("{e:#}");
            tracing::warn!(word_id = %word_id, error = %message, "facet transaction failed");
            FacetWriteReport {
                written: BTreeSet::new(),
                facet_failures: facets
                    .iter()
                    .map(|&facet| FacetFailure {
                        facet,
                        message: message.clone(),
                    })
                    .collect(),
                rows: 0,
            }
        })
    }

    /// Looks up a word id by its text.
    pub fn find_word(&self, word: &str) -> Result<Option<WordId>> {
        let key = normalize_word(word);
        let id: Option<i64> = self
            .conn
            .query_row("SELECT id FROM words WHERE word_text = ?1", [&key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id.map(WordId::new))
    }

    /// Reads the blob for a word text. `None` if the word or its blob is absent.
    pub fn read_blob(&self, word: &str) -> Result<Option<WordRecord>> {
        let key = normalize_word(word);
        let blob: Option<Option<String>> = self
            .conn
            .query_row("SELECT blob FROM words WHERE word_text = ?1", [&key], |row| {
                row.get(0)
            })
            .optional()?;
        parse_blob(blob.flatten().as_deref())
            .with_context(|| format!("Failed to parse blob for '{key}'"))
    }

    /// Reads the blob for a word id.
    pub fn read_blob_by_id(&self, word_id: WordId) -> Result<Option<WordRecord>> {
        let blob: Option<Option<String>> = self
            .conn
            .query_row("SELECT blob FROM words WHERE id = ?1", [word_id.get()], |row| {
                row.get(0)
            })
            .optional()?;
        parse_blob(blob.flatten().as_deref())
            .with_context(|| format!("Failed to parse blob for word {word_id}"))
    }
}

/// Parses a stored blob; blank blobs read as absent.
pub fn parse_blob(blob: Option<&str>) -> Result<Option<WordRecord>> {
    match blob.map(str::trim) {
        None | Some("") | Some("null") | Some("{}") => Ok(None),
        Some(json) => Ok(Some(serde_json::from_str(json)?)),
    }
}
