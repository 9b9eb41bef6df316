pub mod audit;
pub mod config;
pub mod db;
pub mod doctor;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod orchestrator;
pub mod persister;
pub mod repair;
pub mod sanitizer;
pub mod scorer;
pub mod service;
pub mod utils;

pub use audit::{AuditReport, Auditor, BackfillTarget, Finding, FindingKind, Severity};
pub use config::{Config, ConfigError};
pub use db::Database;
pub use error::PipelineError;
pub use extractor::{ExtractError, Extraction, extract};
pub use fetcher::{FetchError, Fetcher, HttpPageSource, HttpPageSourceBuilder, PageSource, RetryPolicy};
pub use models::{DefinitionId, DefinitionScope, Facet, WordId, WordRecord};
pub use orchestrator::{
    BatchCounts, CancellationToken, MigrationEvent, MigrationOptions, MigrationSummary, Migrator,
    ProgressObserver,
};
pub use persister::{DualWriteOutcome, FacetFailure, Persister};
pub use repair::{ClassifierThresholds, RepairEngine, RepairOptions, RepairReport};
pub use sanitizer::sanitize;
pub use scorer::{CompletenessReport, Verdict, score};
pub use service::{CachedEntry, DictionaryService, IngestOutcome, Lookup, LookupSource};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_accessible_from_crate_root() {
        let db = Database::in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn pipeline_types_accessible_from_crate_root() {
        let record = sanitize(&WordRecord::new("  Quick "));
        let report = score(&record);
        assert_eq!(report.verdict(), Verdict::Invalid);

        let options = RepairOptions::none().dry_run(true);
        assert!(options.dry_run);
        assert!(!options.orphans);

        assert_eq!(Facet::ALL.len(), 8);
        assert_eq!(BatchCounts::default().processed, 0);
    }
}
