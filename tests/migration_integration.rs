use std::cell::Cell;
use std::time::Duration;

use anyhow::Result;
use wordbank::{
    Auditor, BatchCounts, CancellationToken, Database, DefinitionScope, MigrationEvent,
    MigrationOptions, Migrator, Persister, extract, sanitize,
};

const QUICK: &str = include_str!("fixtures/quick.html");

/// A corpus where every word has a blob but no sentence rows, as left by an
/// import that only wrote blobs.
fn blob_only_sentences(words: usize) -> Result<Database> {
    let db = Database::in_memory()?;
    let persister = Persister::new(&db);
    for i in 0..words {
        let mut record = sanitize(&extract(QUICK, DefinitionScope::All)?.record);
        record.word = format!("word{i:03}");
        persister.persist(&record)?;
    }
    db.connection().execute("DELETE FROM sentences", [])?;
    Ok(db)
}

fn options(batch_size: usize) -> MigrationOptions {
    MigrationOptions {
        batch_size,
        max_retries: 0,
        retry_delay: Duration::ZERO,
        ..MigrationOptions::default()
    }
}

#[test]
fn migration_converges_the_corpus() -> Result<()> {
    let db = blob_only_sentences(7)?;
    assert_eq!(Auditor::new(&db).plan_backfill()?.len(), 7);

    let batches = Cell::new(0);
    let observer = |event: &MigrationEvent| {
        if matches!(event, MigrationEvent::BatchStarted { .. }) {
            batches.set(batches.get() + 1);
        }
    };
    let summary = Migrator::new(&db)
        .options(options(3))
        .observer(&observer)
        .run()?;

    assert_eq!(
        summary.counts,
        BatchCounts {
            processed: 7,
            succeeded: 7,
            skipped: 0,
            failed: 0
        }
    );
    assert_eq!(batches.get(), 3);
    assert!(Auditor::new(&db).run()?.is_clean());

    // A second run has nothing left to do.
    let again = Migrator::new(&db).options(options(3)).run()?;
    assert!(again.targets.is_empty());
    Ok(())
}

#[test]
fn cancelled_migration_can_be_resumed() -> Result<()> {
    let db = blob_only_sentences(4)?;
    let token = CancellationToken::new();
    let trigger = token.clone();
    let observer = move |event: &MigrationEvent| {
        if let MigrationEvent::Progress(snapshot) = event
            && snapshot.processed == 2
        {
            trigger.cancel();
        }
    };

    let first = Migrator::new(&db)
        .options(options(10))
        .observer(&observer)
        .cancellation(token)
        .run()?;
    assert!(first.cancelled);
    assert_eq!(first.counts.processed, 2);

    let second = Migrator::new(&db).options(options(10)).run()?;
    assert_eq!(second.targets.len(), 2);
    assert_eq!(second.counts.succeeded, 2);
    assert!(Auditor::new(&db).run()?.is_clean());
    Ok(())
}
