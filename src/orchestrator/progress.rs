//! Progress events, counters and rate estimation for batch runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::models::{Facet, WordId};

/// Outcome counts every batch operation reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchCounts {
    pub fn merge(&mut self, other: BatchCounts) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// A word that could not be migrated, with the facets still failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordFailure {
    pub word_id: WordId,
    pub word: String,
    pub facets: Vec<Facet>,
    pub message: String,
    pub attempts: u32,
}

/// Point-in-time view of a running migration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub batch: usize,
    pub batches: usize,
    pub elapsed: Duration,
    pub words_per_minute: Option<f64>,
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    Started {
        total_words: usize,
        batches: usize,
        dry_run: bool,
    },
    BatchStarted {
        batch: usize,
        batches: usize,
        size: usize,
    },
    WordSucceeded {
        word: String,
        facets: Vec<Facet>,
        attempts: u32,
    },
    WordFailed {
        word: String,
        message: String,
        attempts: u32,
    },
    WordSkipped {
        word: String,
        reason: String,
    },
    Progress(ProgressSnapshot),
    Finished {
        counts: BatchCounts,
        elapsed: Duration,
        cancelled: bool,
        aborted: bool,
    },
}

/// Receives migration events. The orchestrator renders nothing itself.
pub trait ProgressObserver {
    fn on_event(&self, event: &MigrationEvent);
}

impl<F> ProgressObserver for F
where
    F: Fn(&MigrationEvent),
{
    fn on_event(&self, event: &MigrationEvent) {
        self(event)
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_event(&self, _event: &MigrationEvent) {}
}

/// Cooperative cancellation flag, checked between words.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Words-per-minute over the most recent completions.
#[derive(Debug, Clone)]
pub struct RateTracker {
    window: usize,
    completions: VecDeque<Instant>,
    started: Instant,
}

impl RateTracker {
    pub const DEFAULT_WINDOW: usize = 50;

    pub fn new(started: Instant, window: usize) -> Self {
        Self {
            window: window.max(1),
            completions: VecDeque::new(),
            started,
        }
    }

    pub fn record(&mut self, at: Instant) {
        if self.completions.len() == self.window {
            self.completions.pop_front();
        }
        self.completions.push_back(at);
    }

    /// Rate over the window, measured from the completion before the window
    /// (or the start) to `now`. `None` until there is a measurable interval.
    pub fn words_per_minute(&self, now: Instant) -> Option<f64> {
        let count = self.completions.len();
        if count == 0 {
            return None;
        }
        let from = if count < self.window {
            self.started
        } else {
            *self.completions.front()?
        };
        let span = now.saturating_duration_since(from).as_secs_f64();
        let measured = if count < self.window { count } else { count - 1 };
        if span <= 0.0 || measured == 0 {
            return None;
        }
        Some(measured as f64 * 60.0 / span)
    }

    pub fn eta(&self, now: Instant, remaining: usize) -> Option<Duration> {
        if remaining == 0 {
            return Some(Duration::ZERO);
        }
        let wpm = self.words_per_minute(now)?;
        Some(Duration::from_secs_f64(remaining as f64 * 60.0 / wpm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn counts_merge() {
        let mut total = BatchCounts {
            processed: 2,
            succeeded: 1,
            skipped: 0,
            failed: 1,
        };
        total.merge(BatchCounts {
            processed: 3,
            succeeded: 2,
            skipped: 1,
            failed: 0,
        });
        assert_eq!(
            total,
            BatchCounts {
                processed: 5,
                succeeded: 3,
                skipped: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn rate_uses_start_until_window_fills() {
        let start = Instant::now();
        let mut rate = RateTracker::new(start, 10);
        rate.record(start + Duration::from_secs(30));
        rate.record(start + Duration::from_secs(60));

        let wpm = rate.words_per_minute(start + Duration::from_secs(60)).unwrap();
        assert!((wpm - 2.0).abs() < 1e-9);

        let eta = rate.eta(start + Duration::from_secs(60), 4).unwrap();
        assert_eq!(eta, Duration::from_secs(120));
    }

    #[test]
    fn rate_rolls_over_recent_completions() {
        let start = Instant::now();
        let mut rate = RateTracker::new(start, 3);
        // Slow start, then one word every 6 seconds.
        rate.record(start + Duration::from_secs(600));
        rate.record(start + Duration::from_secs(606));
        rate.record(start + Duration::from_secs(612));
        rate.record(start + Duration::from_secs(618));

        let wpm = rate
            .words_per_minute(start + Duration::from_secs(618))
            .unwrap();
        assert!((wpm - 10.0).abs() < 1e-9);
    }

    #[test]
    fn no_rate_before_first_completion() {
        let start = Instant::now();
        let rate = RateTracker::new(start, 5);
        assert_eq!(rate.words_per_minute(start + Duration::from_secs(5)), None);
        assert_eq!(rate.eta(start, 3), None);
        assert_eq!(rate.eta(start, 0), Some(Duration::ZERO));
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn closures_are_observers() {
        let seen = RefCell::new(Vec::new());
        let observer = |event: &MigrationEvent| seen.borrow_mut().push(event.clone());

        observer.on_event(&MigrationEvent::WordSkipped {
            word: "quick".into(),
            reason: "nothing to do".into(),
        });

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn percent_handles_empty_runs() {
        let snapshot = ProgressSnapshot {
            processed: 0,
            total: 0,
            batch: 0,
            batches: 0,
            elapsed: Duration::ZERO,
            words_per_minute: None,
            eta: None,
        };
        assert_eq!(snapshot.percent(), 100.0);
    }
}
