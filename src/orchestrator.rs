//! Batch migration of blob facets into the normalized tables.
//!
//! Targets are the words whose blob has facets the tables lack. They are
//! processed one at a time in batches, each word retried with a fixed delay,
//! with progress reported to an optional [`ProgressObserver`].

mod progress;


use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

pub use progress::{
    BatchCounts, CancellationToken, MigrationEvent, NoopObserver, ProgressObserver,
    ProgressSnapshot, RateTracker, WordFailure,
};

use crate::audit::{Auditor, BackfillTarget};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::db::Database;
use crate::models::Facet;
use crate::persister::Persister;
use crate::sanitizer::sanitize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    pub batch_size: usize,
    /// Extra attempts per word after the first one fails.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Stop at the first word that still fails after its retries.
    pub abort_on_error: bool,
    /// List targets without writing anything.
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            abort_on_error: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationSummary {
    pub counts: BatchCounts,
    pub failures: Vec<WordFailure>,
    /// Words selected for migration, in processing order.
    pub targets: Vec<String>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub aborted: bool,
    pub elapsed: Duration,
}

/// Drives Step 2 of the dual write over every blob-ahead word.
pub struct Migrator<'a> {
    db: &'a Database,
    options: MigrationOptions,
    observer: &'a dyn ProgressObserver,
    cancel: CancellationToken,
}

enum WordOutcome {
    Succeeded { facets: Vec<Facet>, attempts: u32 },
    Skipped(String),
    Failed(WordFailure),
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            options: MigrationOptions::default(),
            observer: &NoopObserver,
            cancel: CancellationToken::new(),
        }
    }

    pub fn options(mut self, options: MigrationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Plans and runs the migration.
    pub fn run(&self) -> Result<MigrationSummary> {
        let targets = Auditor::new(self.db).plan_backfill()?;
        self.run_targets(targets)
    }

    /// Runs the migration over an explicit target list.
    pub fn run_targets(&self, targets: Vec<BackfillTarget>) -> Result<MigrationSummary> {
        let started = Instant::now();
        let batch_size = self.options.batch_size.max(1);
        let total = targets.len();
        let batches = total.div_ceil(batch_size);

        let mut summary = MigrationSummary {
            counts: BatchCounts::default(),
            failures: Vec::new(),
            targets: targets.iter().map(|t| t.word.clone()).collect(),
            dry_run: self.options.dry_run,
            cancelled: false,
            aborted: false,
            elapsed: Duration::ZERO,
        };

        tracing::info!(words = total, batches, dry_run = self.options.dry_run, "migration started");
        self.observer.on_event(&MigrationEvent::Started {
            total_words: total,
            batches,
            dry_run: self.options.dry_run,
        });

        if !self.options.dry_run {
            let mut rate = RateTracker::new(started, RateTracker::DEFAULT_WINDOW);

            'batches: for (index, batch) in targets.chunks(batch_size).enumerate() {
                let batch_no = index + 1;
                tracing::info!(batch = batch_no, batches, size = batch.len(), "batch started");
                self.observer.on_event(&MigrationEvent::BatchStarted {
                    batch: batch_no,
                    batches,
                    size: batch.len(),
                });

                for target in batch {
                    if self.cancel.is_cancelled() {
                        tracing::info!("migration cancelled");
                        summary.cancelled = true;
                        break 'batches;
                    }

                    let outcome = self.migrate_word(target);
                    summary.counts.processed += 1;
                    rate.record(Instant::now());

                    let stop = match outcome {
                        WordOutcome::Succeeded { facets, attempts } => {
                            summary.counts.succeeded += 1;
                            self.observer.on_event(&MigrationEvent::WordSucceeded {
                                word: target.word.clone(),
                                facets,
                                attempts,
                            });
                            false
                        }
                        WordOutcome::Skipped(reason) => {
                            summary.counts.skipped += 1;
                            self.observer.on_event(&MigrationEvent::WordSkipped {
                                word: target.word.clone(),
                                reason,
                            });
                            false
                        }
                        WordOutcome::Failed(failure) => {
                            summary.counts.failed += 1;
                            tracing::warn!(
                                word = %failure.word,
                                attempts = failure.attempts,
                                error = %failure.message,
                                "word migration failed"
                            );
                            self.observer.on_event(&MigrationEvent::WordFailed {
                                word: failure.word.clone(),
                                message: failure.message.clone(),
                                attempts: failure.attempts,
                            });
                            summary.failures.push(failure);
                            self.options.abort_on_error
                        }
                    };

                    let now = Instant::now();
                    let remaining = total - summary.counts.processed;
                    self.observer.on_event(&MigrationEvent::Progress(ProgressSnapshot {
                        processed: summary.counts.processed,
                        total,
                        batch: batch_no,
                        batches,
                        elapsed: now.duration_since(started),
                        words_per_minute: rate.words_per_minute(now),
                        eta: rate.eta(now, remaining),
                    }));

                    if stop {
                        summary.aborted = true;
                        break 'batches;
                    }
                }
            }
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            processed = summary.counts.processed,
            succeeded = summary.counts.succeeded,
            skipped = summary.counts.skipped,
            failed = summary.counts.failed,
            "migration finished"
        );
        self.observer.on_event(&MigrationEvent::Finished {
            counts: summary.counts,
            elapsed: summary.elapsed,
            cancelled: summary.cancelled,
            aborted: summary.aborted,
        });
        Ok(summary)
    }

    /// Rewrites the facets one word is missing, retrying only the facets
    /// that failed on the previous attempt.
    fn migrate_word(&self, target: &BackfillTarget) -> WordOutcome {
        let persister = Persister::new(self.db);
        let auditor = Auditor::new(self.db);

        let pending = match self.pending_facets(&persister, &auditor, target) {
            Ok(Some((record, facets))) if !facets.is_empty() => (record, facets),
            Ok(_) => return WordOutcome::Skipped("no facets left to migrate".to_string()),
            Err(e) => {
                return WordOutcome::Failed(WordFailure {
                    word_id: target.word_id,
                    word: target.word.clone(),
                    facets: target.facets.clone(),
                    message: format!("{e:#}"),
                    attempts: 0,
                });
            }
        };
        let (record, mut facets) = pending;
        let migrated = facets.clone();
        let attempts = self.options.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let report = persister.persist_facets(target.word_id, &record, &facets);
            if report.is_clean() {
                return WordOutcome::Succeeded {
                    facets: migrated,
                    attempts: attempt,
                };
            }
            facets = report.facet_failures.iter().map(|f| f.facet).collect();
            last_error = report
                .facet_failures
                .iter()
                .map(|f| format!("{}: {}", f.facet, f.message))
                .collect::<Vec<_>>()
                .join("; ");

            if attempt < attempts {
                tracing::debug!(word = %target.word, attempt, "retrying word");
                if !self.options.retry_delay.is_zero() {
                    thread::sleep(self.options.retry_delay);
                }
            }
        }

        WordOutcome::Failed(WordFailure {
            word_id: target.word_id,
            word: target.word.clone(),
            facets,
            message: last_error,
            attempts,
        })
    }

    /// Rereads the blob and recomputes what is still missing, since the
    /// tables may have changed since planning.
    fn pending_facets(
        &self,
        persister: &Persister<'_>,
        auditor: &Auditor<'_>,
        target: &BackfillTarget,
    ) -> Result<Option<(crate::models::WordRecord, Vec<Facet>)>> {
        let Some(blob) = persister.read_blob_by_id(target.word_id)? else {
            return Ok(None);
        };
        let record = sanitize(&blob);
        let table = auditor.table_facets(target.word_id)?;
        let facets = record
            .present_facets()
            .into_iter()
            .filter(|f| !table.contains(f))
            .collect();
        Ok(Some((record, facets)))
    }
}
