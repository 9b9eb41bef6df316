//! Read-only consistency auditing of the blob and the normalized rows.
//!
//! Two independent scans run over the store: an orphan scan over every child
//! table, and a divergence scan that compares, per word and facet, what the
//! blob holds against what the tables hold. Findings are plain data; nothing
//! here writes.

mod score;


use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

pub use score::{ScoreInputs, integrity_score};

use crate::db::Database;
use crate::db::schema::{CHILD_TABLES, ChildTable, DATA_TABLES, facet_presence_query};
use crate::models::{Facet, WordId};
use crate::persister::parse_blob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        })
    }
}

/// Reconciliation state of one facet of one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetState {
    /// Both sides have data.
    Consistent,
    /// The blob has data the tables lack; backfill can fix this.
    BlobAhead,
    /// The tables have data the blob lacks.
    TableAhead,
    BothEmpty,
}

impl FacetState {
    pub fn from_presence(in_blob: bool, in_table: bool) -> Self {
        match (in_blob, in_table) {
            (true, true) => Self::Consistent,
            (true, false) => Self::BlobAhead,
            (false, true) => Self::TableAhead,
            (false, false) => Self::BothEmpty,
        }
    }

    pub fn is_divergent(self) -> bool {
        matches!(self, Self::BlobAhead | Self::TableAhead)
    }
}

impl fmt::Display for FacetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Consistent => "consistent",
            Self::BlobAhead => "blob ahead",
            Self::TableAhead => "table ahead",
            Self::BothEmpty => "both empty",
        })
    }
}

/// Severity of a divergence on `facet`.
pub fn divergence_severity(facet: Facet) -> Severity {
    match facet {
        Facet::Pronunciation
        | Facet::Basic
        | Facet::Authoritative
        | Facet::Bilingual
        | Facet::English => Severity::High,
        Facet::Web | Facet::Sentences | Facet::WordForms => Severity::Medium,
    }
}

/// A child row whose parent does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanRow {
    pub table: &'static str,
    pub row_id: i64,
    pub parent_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    Orphan(OrphanRow),
    Divergence {
        word_id: WordId,
        word: String,
        facet: Facet,
        state: FacetState,
    },
    /// The blob has definitions but no definition family has rows.
    MissingDefinitions { word_id: WordId, word: String },
    /// The blob is not valid JSON for a record.
    UnreadableBlob {
        word_id: WordId,
        word: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: FindingKind,
}

impl Finding {
    /// Whether this finding counts against the consistency component of
    /// the score.
    pub fn is_inconsistency(&self) -> bool {
        matches!(
            self.kind,
            FindingKind::Orphan(_) | FindingKind::Divergence { .. } | FindingKind::UnreadableBlob { .. }
        )
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FindingKind::Orphan(o) => write!(
                f,
                "[{}] orphan {} row {} (missing parent {})",
                self.severity, o.table, o.row_id, o.parent_id
            ),
            FindingKind::Divergence {
                word, facet, state, ..
            } => write!(f, "[{}] {word}: {facet} {state}", self.severity),
            FindingKind::MissingDefinitions { word, .. } => write!(
                f,
                "[{}] {word}: blob has definitions, tables have none",
                self.severity
            ),
            FindingKind::UnreadableBlob { word, message, .. } => {
                write!(f, "[{}] {word}: unreadable blob ({message})", self.severity)
            }
        }
    }
}

/// Facet presence on both sides for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordFacets {
    pub word_id: WordId,
    pub word: String,
    pub blob: BTreeSet<Facet>,
    pub table: BTreeSet<Facet>,
}

impl WordFacets {
    pub fn state(&self, facet: Facet) -> FacetState {
        FacetState::from_presence(self.blob.contains(&facet), self.table.contains(&facet))
    }

    /// Facets the blob has and the tables lack.
    pub fn blob_ahead(&self) -> Vec<Facet> {
        self.blob.difference(&self.table).copied().collect()
    }

    fn definitions_missing(&self) -> bool {
        let core = |set: &BTreeSet<Facet>| set.iter().any(|f| f.is_core_definition());
        core(&self.blob) && !core(&self.table)
    }
}

/// A word that backfill should repair, and the facets to rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillTarget {
    pub word_id: WordId,
    pub word: String,
    pub facets: Vec<Facet>,
}

/// Row counts and coverage across the corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total_words: u64,
    pub words_with_blob: u64,
    pub with_definitions: u64,
    pub with_pronunciation: u64,
    pub with_sentences: u64,
    pub table_rows: Vec<(&'static str, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub findings: Vec<Finding>,
    pub stats: CorpusStats,
    pub score: u8,
}

impl AuditReport {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn orphans(&self) -> impl Iterator<Item = &OrphanRow> {
        self.findings.iter().filter_map(|f| match &f.kind {
            FindingKind::Orphan(o) => Some(o),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Runs audits against a [`Database`].
pub struct Auditor<'a> {
    db: &'a Database,
    conn: &'a Connection,
}

impl<'a> Auditor<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            conn: db.connection(),
        }
    }

    /// Runs both scans, gathers statistics and computes the score.
    pub fn run(&self) -> Result<AuditReport> {
        let mut findings: Vec<Finding> = self
            .scan_orphans()?
            .into_iter()
            .map(|o| Finding {
                severity: Severity::High,
                kind: FindingKind::Orphan(o),
            })
            .collect();
        findings.extend(self.scan_divergence()?);

        let stats = self.stats()?;
        let inputs = ScoreInputs {
            total_words: stats.total_words,
            with_definitions: stats.with_definitions,
            with_pronunciation: stats.with_pronunciation,
            with_sentences: stats.with_sentences,
            inconsistencies: findings.iter().filter(|f| f.is_inconsistency()).count() as u64,
            critical: findings
                .iter()
                .filter(|f| f.severity == Severity::Critical)
                .count() as u64,
        };
        let score = integrity_score(&inputs);

        tracing::info!(
            findings = findings.len(),
            words = stats.total_words,
            score,
            "audit finished"
        );
        Ok(AuditReport {
            findings,
            stats,
            score,
        })
    }

    /// Every child row, in every child table, whose parent is missing.
    pub fn scan_orphans(&self) -> Result<Vec<OrphanRow>> {
        let mut orphans = Vec::new();
        for child in CHILD_TABLES {
            orphans.extend(self.orphans_in(child)?);
        }
        Ok(orphans)
    }

    pub fn orphans_in(&self, child: ChildTable) -> Result<Vec<OrphanRow>> {
        self.db.bounded(|| {
            let mut stmt = self.conn.prepare(&child.orphan_query())?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(OrphanRow {
                        table: child.table,
                        row_id: row.get(0)?,
                        parent_id: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()
                .with_context(|| format!("Failed to scan {} for orphans", child.table))?;
            Ok(rows)
        })
    }

    /// Divergence findings for every word with a non-empty blob.
    pub fn scan_divergence(&self) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        self.for_each_blob_word(|outcome| {
            match outcome {
                Ok(facets) => {
                    for facet in Facet::ALL {
                        let state = facets.state(facet);
                        if state.is_divergent() {
                            findings.push(Finding {
                                severity: divergence_severity(facet),
                                kind: FindingKind::Divergence {
                                    word_id: facets.word_id,
                                    word: facets.word.clone(),
                                    facet,
                                    state,
                                },
                            });
                        }
                    }
                    if facets.definitions_missing() {
                        findings.push(Finding {
                            severity: Severity::Critical,
                            kind: FindingKind::MissingDefinitions {
                                word_id: facets.word_id,
                                word: facets.word,
                            },
                        });
                    }
                }
                Err((word_id, word, message)) => findings.push(Finding {
                    severity: Severity::High,
                    kind: FindingKind::UnreadableBlob {
                        word_id,
                        word,
                        message,
                    },
                }),
            }
            Ok(())
        })?;
        Ok(findings)
    }

    /// Words whose blob has facets the tables lack.
    pub fn plan_backfill(&self) -> Result<Vec<BackfillTarget>> {
        let mut targets = Vec::new();
        self.for_each_blob_word(|outcome| {
            if let Ok(facets) = outcome {
                let missing = facets.blob_ahead();
                if !missing.is_empty() {
                    targets.push(BackfillTarget {
                        word_id: facets.word_id,
                        word: facets.word,
                        facets: missing,
                    });
                }
            }
            Ok(())
        })?;
        Ok(targets)
    }

    /// Facet presence on both sides for one word.
    pub fn word_facets(&self, word_id: WordId) -> Result<WordFacets> {
        let (word, blob): (String, Option<String>) = self.conn.query_row(
            "SELECT word_text, blob FROM words WHERE id = ?1",
            [word_id.get()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let record = parse_blob(blob.as_deref())?;
        Ok(WordFacets {
            word_id,
            word,
            blob: record.map(|r| r.present_facets()).unwrap_or_default(),
            table: self.table_facets(word_id)?,
        })
    }

    /// Facets with at least one usable row for `word_id`.
    pub fn table_facets(&self, word_id: WordId) -> Result<BTreeSet<Facet>> {
        self.db.bounded(|| {
            let mut present = BTreeSet::new();
            for facet in Facet::ALL {
                let exists: bool = self.conn.query_row(
                    facet_presence_query(facet),
                    [word_id.get()],
                    |row| row.get(0),
                )?;
                if exists {
                    present.insert(facet);
                }
            }
            Ok(present)
        })
    }

    /// Coverage counts over all words, plus raw row counts per table.
    pub fn stats(&self) -> Result<CorpusStats> {
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = self
                .db
                .bounded(|| Ok(self.conn.query_row(sql, [], |row| row.get(0))?))?;
            Ok(n as u64)
        };

        let mut table_rows = Vec::with_capacity(DATA_TABLES.len());
        for table in DATA_TABLES {
            table_rows.push((table, count(&format!("SELECT COUNT(*) FROM {table}"))?));
        }

        Ok(CorpusStats {
            total_words: count("SELECT COUNT(*) FROM words")?,
            words_with_blob: count(
                "SELECT COUNT(*) FROM words WHERE blob IS NOT NULL AND TRIM(blob) <> ''",
            )?,
            with_definitions: count(
                "SELECT COUNT(DISTINCT d.word_id) FROM definitions d
                 JOIN words w ON w.id = d.word_id
                 WHERE d.def_type IN ('basic', 'authoritative', 'bilingual', 'english')
                   AND (d.meaning <> '' OR d.chinese_meaning <> '' OR d.english_meaning <> '')",
            )?,
            with_pronunciation: count(
                "SELECT COUNT(DISTINCT p.word_id) FROM pronunciations p
                 JOIN words w ON w.id = p.word_id
                 WHERE p.phonetic <> ''",
            )?,
            with_sentences: count(
                "SELECT COUNT(DISTINCT s.word_id) FROM sentences s
                 JOIN words w ON w.id = s.word_id
                 WHERE s.english <> '' OR s.chinese <> ''",
            )?,
            table_rows,
        })
    }

    /// Calls `f` for every word with a non-empty blob, in id order. Blobs
    /// that fail to parse are passed as `Err((id, word, message))`.
    fn for_each_blob_word<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(std::result::Result<WordFacets, (WordId, String, String)>) -> Result<()>,
    {
        let words = self.db.bounded(|| {
            let mut stmt = self.conn.prepare(
                "SELECT id, word_text, blob FROM words
                 WHERE blob IS NOT NULL AND TRIM(blob) <> ''
                 ORDER BY id",
            )?;
            let words = stmt
                .query_map([], |row| {
                    Ok((
                        WordId::new(row.get(0)?),
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(words)
        })?;

        for (word_id, word, blob) in words {
            match parse_blob(Some(&blob)) {
                Ok(record) => {
                    let blob = record.map(|r| r.present_facets()).unwrap_or_default();
                    let table = self.table_facets(word_id)?;
                    f(Ok(WordFacets {
                        word_id,
                        word,
                        blob,
                        table,
                    }))?;
                }
                Err(e) => f(Err((word_id, word, format!("{e:#}"))))?,
            }
        }
        Ok(())
    }
}
