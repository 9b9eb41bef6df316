//! Corrective actions for audit findings.
//!
//! Four independent operations, each with a dry-run mode, run in a fixed
//! order: orphan removal, heuristic reclassification, corrupt-row cleanup,
//! then blob→table backfill. Reclassification runs before cleanup so that
//! empty definitions with misfiled children are recovered rather than
//! deleted.

pub mod reclassify;


use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;

pub use reclassify::{ChildClass, ClassifierThresholds, ReclassifyPlan, classify};

use crate::audit::Auditor;
use crate::db::{Database, in_transaction};
use crate::models::{DefinitionId, DefinitionType, WordId};
use crate::orchestrator::{BatchCounts, MigrationOptions, MigrationSummary, Migrator};
use crate::persister::facets::{DefinitionText, upsert_definition};
use crate::utils::now_unix;

/// Upper bound on orphan rescans; each pass can only uncover rows whose
/// parent was removed in the previous one.
const MAX_ORPHAN_PASSES: usize = 8;

/// Which operations to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOptions {
    pub orphans: bool,
    pub reclassify: bool,
    pub corrupt: bool,
    pub backfill: bool,
    pub dry_run: bool,
    pub thresholds: ClassifierThresholds,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl RepairOptions {
    /// Every operation, writing.
    pub fn all() -> Self {
        Self {
            orphans: true,
            reclassify: true,
            corrupt: true,
            backfill: true,
            dry_run: false,
            thresholds: ClassifierThresholds::default(),
        }
    }

    /// No operation; enable the ones wanted.
    pub fn none() -> Self {
        Self {
            orphans: false,
            reclassify: false,
            corrupt: false,
            backfill: false,
            ..Self::all()
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrphanRepair {
    pub removed: usize,
    pub passes: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclassifyCounts {
    /// Empty authoritative/bilingual definitions with children.
    pub candidates: usize,
    pub promoted: usize,
    pub siblings_created: usize,
    pub examples_renumbered: usize,
    /// Candidates none of whose children looked like a definition.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorruptCounts {
    pub pronunciations: usize,
    pub definitions: usize,
    pub sentences: usize,
}

impl CorruptCounts {
    pub fn total(&self) -> usize {
        self.pronunciations + self.definitions + self.sentences
    }
}

/// One repair step that failed for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFailure {
    pub operation: &'static str,
    pub target: String,
    pub message: String,
}

/// Outcome of a repair run. Operations that were not requested are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairReport {
    pub dry_run: bool,
    pub orphans: Option<OrphanRepair>,
    pub reclassify: Option<ReclassifyCounts>,
    pub corrupt: Option<CorruptCounts>,
    pub backfill: Option<MigrationSummary>,
    /// Per-target counts across reclassification and backfill.
    pub counts: BatchCounts,
    pub failures: Vec<RepairFailure>,
}

/// An empty definition whose children may hold its real gloss.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    id: DefinitionId,
    word_id: WordId,
    word: String,
    def_type: DefinitionType,
    part_of_speech: String,
}

/// Applies repairs to a [`Database`].
pub struct RepairEngine<'a> {
    db: &'a Database,
    conn: &'a Connection,
    options: RepairOptions,
}

impl<'a> RepairEngine<'a> {
    pub fn new(db: &'a Database, options: RepairOptions) -> Self {
        Self {
            db,
            conn: db.connection(),
            options,
        }
    }

    /// Runs the enabled operations in order.
    pub fn run(&self) -> Result<RepairReport> {
        let mut report = RepairReport {
            dry_run: self.options.dry_run,
            orphans: None,
            reclassify: None,
            corrupt: None,
            backfill: None,
            counts: BatchCounts::default(),
            failures: Vec::new(),
        };

        if self.options.orphans {
            report.orphans = Some(self.remove_orphans()?);
        }
        if self.options.reclassify {
            let (counts, batch, failures) = self.reclassify()?;
            report.reclassify = Some(counts);
            report.counts.merge(batch);
            report.failures.extend(failures);
        }
        if self.options.corrupt {
            report.corrupt = Some(self.clean_corrupt()?);
        }
        if self.options.backfill {
            let summary = self.backfill()?;
            report.counts.merge(summary.counts);
            report.failures.extend(summary.failures.iter().map(|f| RepairFailure {
                operation: "backfill",
                target: f.word.clone(),
                message: f.message.clone(),
            }));
            report.backfill = Some(summary);
        }

        tracing::info!(
            dry_run = report.dry_run,
            processed = report.counts.processed,
            failed = report.counts.failed,
            "repair finished"
        );
        Ok(report)
    }

    /// Deletes orphaned rows, rescanning until a pass finds none.
    pub fn remove_orphans(&self) -> Result<OrphanRepair> {
        let auditor = Auditor::new(self.db);
        let mut result = OrphanRepair::default();

        while result.passes < MAX_ORPHAN_PASSES {
            let orphans = auditor.scan_orphans()?;
            if orphans.is_empty() {
                break;
            }
            result.passes += 1;

            if self.options.dry_run {
                result.removed += orphans.len();
                break;
            }

            in_transaction(self.conn, || {
                for orphan in &orphans {
                    result.removed += self.conn.execute(
                        &format!("DELETE FROM {} WHERE id = ?1", orphan.table),
                        [orphan.row_id],
                    )?;
                }
                Ok(())
            })
            .context("Failed to delete orphans")?;
            tracing::info!(pass = result.passes, rows = orphans.len(), "removed orphans");
        }

        Ok(result)
    }

    /// Recovers definitions stored as example rows under empty
    /// authoritative and bilingual definitions.
    pub fn reclassify(&self) -> Result<(ReclassifyCounts, BatchCounts, Vec<RepairFailure>)> {
        let mut counts = ReclassifyCounts::default();
        let mut batch = BatchCounts::default();
        let mut failures = Vec::new();

        for candidate in self.reclassify_candidates()? {
            counts.candidates += 1;
            batch.processed += 1;

            let children = self.children_of(candidate.id)?;
            let plan = reclassify::plan(&children, &self.options.thresholds);
            if plan.is_empty() {
                counts.skipped += 1;
                batch.skipped += 1;
                continue;
            }

            let renumbered = plan.parent_example_ids().len()
                + plan.siblings.iter().map(|s| s.example_ids.len()).sum::<usize>();

            if !self.options.dry_run
                && let Err(e) = self.apply_plan(&candidate, &plan)
            {
                let message = format!("{e:#}");
                tracing::warn!(word = %candidate.word, definition = %candidate.id, error = %message, "reclassification failed");
                batch.failed += 1;
                failures.push(RepairFailure {
                    operation: "reclassify",
                    target: format!("{} ({} #{})", candidate.word, candidate.def_type, candidate.id),
                    message,
                });
                continue;
            }

            counts.promoted += 1;
            counts.siblings_created += plan.siblings.len();
            counts.examples_renumbered += renumbered;
            batch.succeeded += 1;
        }

        Ok((counts, batch, failures))
    }

    fn reclassify_candidates(&self) -> Result<Vec<Candidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.word_id, COALESCE(w.word_text, ''), d.def_type, d.part_of_speech
             FROM definitions d
             LEFT JOIN words w ON w.id = d.word_id
             WHERE d.def_type IN ('authoritative', 'bilingual')
               AND d.meaning = '' AND d.chinese_meaning = '' AND d.english_meaning = ''
               AND EXISTS(SELECT 1 FROM definition_examples e WHERE e.definition_id = d.id)
             ORDER BY d.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, word_id, word, def_type, part_of_speech)| {
                Ok(Candidate {
                    id: DefinitionId::new(id),
                    word_id: WordId::new(word_id),
                    word,
                    def_type: def_type.parse().map_err(anyhow::Error::msg)?,
                    part_of_speech,
                })
            })
            .collect()
    }

    fn children_of(&self, definition_id: DefinitionId) -> Result<Vec<reclassify::ChildText>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, english, chinese FROM definition_examples
             WHERE definition_id = ?1 ORDER BY ex_order",
        )?;
        let children = stmt
            .query_map([definition_id.get()], |row| {
                Ok(reclassify::ChildText {
                    id: row.get(0)?,
                    english: row.get(1)?,
                    chinese: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(children)
    }

    fn apply_plan(&self, candidate: &Candidate, plan: &ReclassifyPlan) -> Result<()> {
        let Some(promoted) = &plan.promoted else {
            return Ok(());
        };
        let conn = self.conn;
        let now = now_unix();

        in_transaction(conn, || {
            conn.execute(
                "UPDATE definitions SET chinese_meaning = ?1, english_meaning = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![promoted.chinese, promoted.english, now, candidate.id.get()],
            )?;
            conn.execute(
                "DELETE FROM definition_examples WHERE id = ?1",
                [promoted.source_id],
            )?;

            for sibling in &plan.siblings {
                let next_order: i64 = conn.query_row(
                    "SELECT COALESCE(MAX(def_order), 0) + 1 FROM definitions
                     WHERE word_id = ?1 AND def_type = ?2 AND part_of_speech = ?3",
                    params![
                        candidate.word_id.get(),
                        candidate.def_type.as_str(),
                        candidate.part_of_speech
                    ],
                    |row| row.get(0),
                )?;
                let text = DefinitionText {
                    chinese_meaning: sibling.chinese.clone(),
                    english_meaning: sibling.english.clone(),
                    ..DefinitionText::default()
                };
                let new_id = upsert_definition(
                    conn,
                    candidate.word_id,
                    candidate.def_type,
                    &candidate.part_of_speech,
                    next_order,
                    &text,
                    now,
                )?;

                for (i, example_id) in sibling.example_ids.iter().enumerate() {
                    conn.execute(
                        "UPDATE definition_examples SET definition_id = ?1, ex_order = ?2
                         WHERE id = ?3",
                        params![new_id.get(), i as i64 + 1, example_id],
                    )?;
                }
                conn.execute(
                    "DELETE FROM definition_examples WHERE id = ?1",
                    [sibling.source_id],
                )?;
            }

            renumber_examples(conn, candidate.id)?;
            Ok(())
        })
    }

    /// Deletes rows that carry no usable text.
    pub fn clean_corrupt(&self) -> Result<CorruptCounts> {
        const PRONUNCIATIONS: &str = "FROM pronunciations WHERE TRIM(COALESCE(phonetic, '')) = ''";
        const DEFINITIONS: &str = "FROM definitions
             WHERE TRIM(COALESCE(meaning, '')) = ''
               AND TRIM(COALESCE(chinese_meaning, '')) = ''
               AND TRIM(COALESCE(english_meaning, '')) = ''";
        const SENTENCES: &str = "FROM sentences
             WHERE TRIM(COALESCE(english, '')) = '' AND TRIM(COALESCE(chinese, '')) = ''";

        let conn = self.conn;
        let run = |filter: &str| -> Result<usize> {
            if self.options.dry_run {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) {filter}"), [], |row| row.get(0))?;
                Ok(n as usize)
            } else {
                Ok(conn.execute(&format!("DELETE {filter}"), [])?)
            }
        };

        let counts = in_transaction(conn, || {
            Ok(CorruptCounts {
                pronunciations: run(PRONUNCIATIONS)?,
                definitions: run(DEFINITIONS)?,
                sentences: run(SENTENCES)?,
            })
        })
        .context("Failed to clean corrupt rows")?;

        if counts.total() > 0 {
            tracing::info!(
                pronunciations = counts.pronunciations,
                definitions = counts.definitions,
                sentences = counts.sentences,
                dry_run = self.options.dry_run,
                "corrupt rows"
            );
        }
        Ok(counts)
    }

    /// Rewrites blob-ahead facets from the blob.
    pub fn backfill(&self) -> Result<MigrationSummary> {
        Migrator::new(self.db)
            .options(MigrationOptions {
                max_retries: 0,
                dry_run: self.options.dry_run,
                ..MigrationOptions::default()
            })
            .run()
    }
}

/// Renumbers a definition's examples densely from 1, keeping their order.
///
/// Orders pass through negative values first so that no intermediate state
/// collides with the `(definition_id, ex_order)` key.
pub fn renumber_examples(conn: &Connection, definition_id: DefinitionId) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT id, ex_order FROM definition_examples WHERE definition_id = ?1 ORDER BY ex_order",
    )?;
    let rows = stmt
        .query_map([definition_id.get()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut changed = 0;
    for (i, (id, order)) in rows.iter().enumerate() {
        let target = i as i64 + 1;
        if *order != target {
            changed += 1;
        }
        conn.execute(
            "UPDATE definition_examples SET ex_order = ?1 WHERE id = ?2",
            params![-target, id],
        )?;
    }
    conn.execute(
        "UPDATE definition_examples SET ex_order = -ex_order
         WHERE definition_id = ?1 AND ex_order < 0",
        [definition_id.get()],
    )?;

    Ok(changed)
}
