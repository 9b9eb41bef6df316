use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wordbank::doctor::{self, ProgressPrinter};
use wordbank::service::read_cached;
use wordbank::utils::ensure_database_directory;
use wordbank::{
    Auditor, Config, Database, DefinitionScope, DictionaryService, Fetcher, HttpPageSource,
    MigrationOptions, Migrator, PipelineError, RepairEngine, RepairOptions,
};

/// wordbank - dictionary ingest and consistency tooling
#[derive(Parser)]
#[command(name = "wordbank")]
#[command(about = "Fetch dictionary entries and keep their stored forms consistent")]
#[command(version)]
struct Cli {
    /// Database file (overrides WORDBANK_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Fetch a word from upstream and store it
    Fetch(FetchCommand),
    /// Show the stored entry for a word
    Show(ShowCommand),
    /// Audit the store for orphans and blob/table drift
    Audit,
    /// Repair audit findings
    Repair(RepairCommand),
    /// Migrate blob facets into the normalized tables
    Migrate(MigrateCommand),
}

#[derive(Args)]
struct FetchCommand {
    /// The word to fetch
    #[arg(value_name = "WORD")]
    word: String,

    /// Definition families to extract: all, authoritative, bilingual, english
    #[arg(short, long, default_value = "all")]
    scope: DefinitionScope,

    /// Serve the stored entry when it is already complete
    #[arg(long)]
    cache_first: bool,
}

#[derive(Args)]
struct ShowCommand {
    /// The word to show
    #[arg(value_name = "WORD")]
    word: String,
}

#[derive(Args)]
struct RepairCommand {
    /// Delete rows whose parent no longer exists
    #[arg(long)]
    orphans: bool,

    /// Recover definitions stored as examples
    #[arg(long)]
    reclassify: bool,

    /// Delete rows without usable text
    #[arg(long)]
    corrupt: bool,

    /// Rewrite table facets the blob has but the tables lack
    #[arg(long)]
    backfill: bool,

    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[derive(Args)]
struct MigrateCommand {
    /// Words per batch (defaults to WORDBANK_BATCH_SIZE or 50)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Extra attempts per word after a failure
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Delay between attempts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Stop at the first word that still fails after retries
    #[arg(long)]
    abort_on_error: bool,

    /// List the words that would be migrated
    #[arg(long)]
    dry_run: bool,
}

/// Errors caused by the caller's input.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Word cannot be empty")]
    EmptyWord,

    #[error("No stored entry for '{0}'")]
    UnknownWord(String),
}

fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wordbank=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(&cli);

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are validation rejections, upstream "not found" and unknown
/// stored words. Everything else, including configuration and database
/// failures, is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<PipelineError>() {
        return e.is_user_error();
    }
    error.downcast_ref::<CliError>().is_some()
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(path) = &cli.db {
        config.db_path = Some(path.clone());
    }

    match &cli.command {
        Commands::Fetch(cmd) => handle_fetch(cmd, &config),
        Commands::Show(cmd) => handle_show(cmd, &config),
        Commands::Audit => handle_audit(&config),
        Commands::Repair(cmd) => handle_repair(cmd, &config),
        Commands::Migrate(cmd) => handle_migrate(cmd, &config),
    }
}

fn open_database(config: &Config) -> Result<(Database, PathBuf)> {
    let db_path = config.resolved_db_path()?;
    ensure_database_directory(&db_path)?;
    let db = Database::open_with_timeout(&db_path, config.db_timeout)
        .context("Failed to open database")?;
    db.set_statement_timeout(config.statement_timeout);
    Ok((db, db_path))
}

fn build_service(config: &Config) -> Result<DictionaryService<HttpPageSource>> {
    let (db, _) = open_database(config)?;
    let source = config.page_source().context("Failed to build HTTP client")?;
    Ok(DictionaryService::new(
        db,
        Fetcher::with_policy(source, config.fetch_policy()),
    ))
}

fn handle_fetch(cmd: &FetchCommand, config: &Config) -> Result<()> {
    if cmd.word.trim().is_empty() {
        return Err(CliError::EmptyWord.into());
    }
    let service = build_service(config)?;

    if cmd.cache_first {
        let lookup = service.lookup(&cmd.word, cmd.scope)?;
        doctor::print_word(&lookup.record, &lookup.report);
        println!();
        println!("source: {:?}", lookup.source);
        return Ok(());
    }

    let outcome = service.fetch_and_persist(&cmd.word, cmd.scope)?;
    doctor::print_word(&outcome.record, &outcome.report);
    for failure in &outcome.write.facet_failures {
        eprintln!("warning: {} rows not written: {}", failure.facet, failure.message);
    }
    Ok(())
}

fn handle_show(cmd: &ShowCommand, config: &Config) -> Result<()> {
    let (db, _) = open_database(config)?;

    let entry = read_cached(&db, &cmd.word)?
        .ok_or_else(|| CliError::UnknownWord(cmd.word.clone()))?;
    doctor::print_word(&entry.record, &entry.report);
    Ok(())
}

fn handle_audit(config: &Config) -> Result<()> {
    let (db, db_path) = open_database(config)?;

    let status = doctor::check_database(&db);
    let migrations = doctor::get_applied_migrations(&db)?;
    let report = Auditor::new(&db).run().context("Audit failed")?;

    doctor::print_health_report(
        &db_path.display().to_string(),
        &status,
        &migrations,
        &report.stats,
    );
    println!();
    doctor::print_audit_report(&report);
    Ok(())
}

fn repair_options(cmd: &RepairCommand) -> RepairOptions {
    let selected = cmd.orphans || cmd.reclassify || cmd.corrupt || cmd.backfill;
    let options = if selected {
        RepairOptions {
            orphans: cmd.orphans,
            reclassify: cmd.reclassify,
            corrupt: cmd.corrupt,
            backfill: cmd.backfill,
            ..RepairOptions::none()
        }
    } else {
        RepairOptions::all()
    };
    options.dry_run(cmd.dry_run)
}

fn handle_repair(cmd: &RepairCommand, config: &Config) -> Result<()> {
    let (db, _) = open_database(config)?;
    let options = repair_options(cmd);

    if !options.dry_run && !cmd.yes {
        let preview = RepairEngine::new(&db, options.clone().dry_run(true))
            .run()
            .context("Repair preview failed")?;
        doctor::print_repair_report(&preview);
        if !doctor::confirm("Apply these repairs?") {
            println!("Cancelled.");
            return Ok(());
        }
        println!();
    }

    let report = RepairEngine::new(&db, options)
        .run()
        .context("Repair failed")?;
    doctor::print_repair_report(&report);
    Ok(())
}

fn handle_migrate(cmd: &MigrateCommand, config: &Config) -> Result<()> {
    let (db, _) = open_database(config)?;
    let options = MigrationOptions {
        batch_size: cmd.batch_size.unwrap_or(config.batch_size),
        max_retries: cmd.max_retries,
        retry_delay: Duration::from_millis(cmd.retry_delay_ms),
        abort_on_error: cmd.abort_on_error,
        dry_run: cmd.dry_run,
    };

    let printer = ProgressPrinter;
    let summary = Migrator::new(&db)
        .options(options)
        .observer(&printer)
        .run()
        .context("Migration failed")?;
    doctor::print_migration_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repair_command() -> RepairCommand {
        RepairCommand {
            orphans: false,
            reclassify: false,
            corrupt: false,
            backfill: false,
            dry_run: false,
            yes: false,
        }
    }

    #[test]
    fn no_repair_flags_selects_every_operation() {
        let options = repair_options(&repair_command());
        assert_eq!(options, RepairOptions::all());
    }

    #[test]
    fn repair_flags_select_only_named_operations() {
        let options = repair_options(&RepairCommand {
            orphans: true,
            dry_run: true,
            ..repair_command()
        });
        assert!(options.orphans);
        assert!(!options.reclassify);
        assert!(!options.corrupt);
        assert!(!options.backfill);
        assert!(options.dry_run);
    }

    #[test]
    fn rejections_are_user_errors() {
        let err = anyhow::Error::new(PipelineError::Fetch(wordbank::FetchError::Http {
            status: 404,
        }));
        assert!(is_user_error(&err));

        let err = anyhow::Error::new(CliError::UnknownWord("qwzxv".into()));
        assert!(is_user_error(&err));
    }

    #[test]
    fn storage_failures_are_internal_errors() {
        let err = anyhow::Error::new(PipelineError::Storage(anyhow::anyhow!("disk full")));
        assert!(!is_user_error(&err));

        let err = anyhow::anyhow!("Failed to open database");
        assert!(!is_user_error(&err));
    }

    /// Configuration with a temp database and a source URL that cannot be built.
    fn offline_config(dir: &tempfile::TempDir) -> Config {
        Config {
            db_path: Some(dir.path().join("words.db")),
            source_url: "not a url".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn show_reads_the_store_without_a_page_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(&dir);
        assert!(config.page_source().is_err());

        let (db, _) = open_database(&config).unwrap();
        let mut record = wordbank::WordRecord::new("quick");
        record.definitions.basic.push(wordbank::models::BasicDefinition {
            part_of_speech: "adj.".into(),
            meaning: "快的".into(),
        });
        wordbank::Persister::new(&db).persist(&record).unwrap();
        drop(db);

        let cmd = ShowCommand {
            word: "Quick".to_string(),
        };
        handle_show(&cmd, &config).unwrap();
    }

    #[test]
    fn show_unknown_word_is_a_user_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(&dir);

        let cmd = ShowCommand {
            word: "qwzxv".to_string(),
        };
        let err = handle_show(&cmd, &config).unwrap_err();
        assert!(is_user_error(&err));
    }

    #[test]
    fn cli_parses_migrate_flags() {
        let cli = Cli::try_parse_from([
            "wordbank",
            "migrate",
            "--batch-size",
            "10",
            "--max-retries",
            "0",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Migrate(cmd) => {
                assert_eq!(cmd.batch_size, Some(10));
                assert_eq!(cmd.max_retries, 0);
                assert!(cmd.dry_run);
                assert!(!cmd.abort_on_error);
            }
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn cli_parses_fetch_scope() {
        let cli = Cli::try_parse_from(["wordbank", "fetch", "quick", "--scope", "bilingual"]).unwrap();
        match cli.command {
            Commands::Fetch(cmd) => {
                assert_eq!(cmd.word, "quick");
                assert_eq!(cmd.scope, DefinitionScope::Bilingual);
            }
            _ => panic!("expected fetch"),
        }
    }
}
