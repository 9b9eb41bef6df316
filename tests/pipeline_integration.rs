use std::collections::HashMap;

use anyhow::Result;
use wordbank::{
    Auditor, Database, DefinitionScope, DictionaryService, FetchError, Fetcher, LookupSource,
    PageSource, PipelineError, RetryPolicy, Verdict,
};

const QUICK: &str = include_str!("fixtures/quick.html");
const HELLO_ALT: &str = include_str!("fixtures/hello_alt.html");
const NOT_FOUND: &str = include_str!("fixtures/not_found.html");

/// Serves fixture pages by word; unknown words get an upstream 404.
struct FixtureSource {
    pages: HashMap<&'static str, &'static str>,
}

impl FixtureSource {
    fn new() -> Self {
        let pages = HashMap::from([("quick", QUICK), ("hello", HELLO_ALT), ("qwzxv", NOT_FOUND)]);
        Self { pages }
    }
}

impl PageSource for FixtureSource {
    fn fetch_page(&self, word: &str) -> Result<String, FetchError> {
        self.pages
            .get(word)
            .map(|html| html.to_string())
            .ok_or(FetchError::Http { status: 404 })
    }
}

fn service(db: Database) -> DictionaryService<FixtureSource> {
    DictionaryService::new(
        db,
        Fetcher::with_policy(FixtureSource::new(), RetryPolicy::no_retry()),
    )
}

#[test]
fn fetched_words_survive_reopening_the_database() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("words.db");

    {
        let service = service(Database::open(&path)?);
        let outcome = service.fetch_and_persist("quick", DefinitionScope::All)?;
        assert!(outcome.write.facet_failures.is_empty());
    }

    let service = service(Database::open(&path)?);
    let cached = service.read_cached("QUICK")?.expect("stored entry");
    assert_eq!(cached.record.word, "quick");
    assert_eq!(cached.report.verdict(), Verdict::Complete);

    let report = Auditor::new(service.database()).run()?;
    assert!(report.is_clean());
    assert_eq!(report.score, 100);
    Ok(())
}

#[test]
fn hello_scenario_is_complete_with_missing_sentences() -> Result<()> {
    let service = service(Database::in_memory()?);

    let outcome = service.fetch_and_persist("hello", DefinitionScope::All)?;

    assert!(outcome.report.is_complete);
    assert!(outcome.report.is_partially_valid);
    assert!(
        outcome
            .report
            .issues
            .contains(&"missing example sentences".to_string())
    );
    assert!(Auditor::new(service.database()).run()?.is_clean());
    Ok(())
}

#[test]
fn rejected_and_missing_words_write_nothing() -> Result<()> {
    let service = service(Database::in_memory()?);

    let rejected = service
        .fetch_and_persist("qwzxv", DefinitionScope::All)
        .unwrap_err();
    assert!(matches!(rejected, PipelineError::ValidationRejected { .. }));

    let missing = service
        .fetch_and_persist("nosuchword", DefinitionScope::All)
        .unwrap_err();
    assert_eq!(missing.status_hint(), 404);

    let stats = Auditor::new(service.database()).stats()?;
    assert_eq!(stats.total_words, 0);
    Ok(())
}

#[test]
fn refetching_is_idempotent() -> Result<()> {
    let service = service(Database::in_memory()?);

    service.fetch_and_persist("quick", DefinitionScope::All)?;
    let before = Auditor::new(service.database()).stats()?;
    service.fetch_and_persist("quick", DefinitionScope::All)?;
    let after = Auditor::new(service.database()).stats()?;

    assert_eq!(before, after);
    Ok(())
}

#[test]
fn lookup_is_cache_first() -> Result<()> {
    let service = service(Database::in_memory()?);

    assert_eq!(
        service.lookup("quick", DefinitionScope::All)?.source,
        LookupSource::Upstream
    );
    assert_eq!(
        service.lookup("quick", DefinitionScope::All)?.source,
        LookupSource::Cache
    );
    Ok(())
}
