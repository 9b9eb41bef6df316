//! Operator report printing for wordbank.
//!
//! Provides the output side of the maintenance commands:
//! - Store health (database, migrations, corpus statistics)
//! - Audit findings and the integrity score
//! - Repair and migration summaries, plus live migration progress

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;

use crate::audit::{AuditReport, CorpusStats, Severity};
use crate::db::Database;
use crate::models::WordRecord;
use crate::orchestrator::{MigrationEvent, MigrationSummary, ProgressObserver};
use crate::repair::RepairReport;
use crate::scorer::{CompletenessReport, Verdict};

// ANSI color codes for terminal output
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// How many findings or failures to list before summarizing the rest.
const LIST_LIMIT: usize = 10;

/// Health status for a component.
#[derive(Debug, Clone)]
pub enum HealthStatus {
    /// Component is healthy
    Ok,
    /// Component has a warning but is functional
    Warning(String),
    /// Component is not functional
    Error(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

/// Migration tracking information.
#[derive(Debug)]
pub struct MigrationInfo {
    pub version: u32,
    pub description: String,
    pub applied_at: i64,
}

// ============================================================================
// Health
// ============================================================================

pub fn check_database(db: &Database) -> HealthStatus {
    match db.connection().query_row("SELECT 1", [], |_| Ok(())) {
        Ok(()) => HealthStatus::Ok,
        Err(e) => HealthStatus::Error(format!("Connection test failed: {e}")),
    }
}

pub fn get_applied_migrations(db: &Database) -> Result<Vec<MigrationInfo>> {
    let conn = db.connection();

    let mut stmt = conn.prepare(
        "SELECT version, applied_at, description FROM schema_migrations ORDER BY version",
    )?;

    let migrations = stmt.query_map([], |row| {
        Ok(MigrationInfo {
            version: row.get(0)?,
            applied_at: row.get(1)?,
            description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        })
    })?;

    migrations.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn status_symbol(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => "\u{2713}",
        HealthStatus::Warning(_) => "!",
        HealthStatus::Error(_) => "\u{2717}",
    }
}

fn status_color(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => GREEN,
        HealthStatus::Warning(_) => YELLOW,
        HealthStatus::Error(_) => RED,
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Medium => YELLOW,
        Severity::High | Severity::Critical => RED,
    }
}

fn score_color(score: u8) -> &'static str {
    match score {
        90..=100 => GREEN,
        60..=89 => YELLOW,
        _ => RED,
    }
}

pub fn print_health_report(
    db_path: &str,
    status: &HealthStatus,
    migrations: &[MigrationInfo],
    stats: &CorpusStats,
) {
    println!("{BOLD}wordbank doctor{RESET}");
    println!();

    println!("{BOLD}Database{RESET}");
    println!(
        "  {}{}{RESET} Connection: {}",
        status_color(status),
        status_symbol(status),
        match status {
            HealthStatus::Ok => "OK".to_string(),
            HealthStatus::Warning(w) => w.clone(),
            HealthStatus::Error(e) => e.clone(),
        }
    );
    println!("    {DIM}Path: {db_path}{RESET}");
    println!();

    println!("{BOLD}Migrations{RESET}");
    if migrations.is_empty() {
        println!("  {YELLOW}No migrations applied{RESET}");
    } else {
        for m in migrations {
            println!(
                "  {GREEN}{}{RESET} v{}: {} {DIM}({}){RESET}",
                status_symbol(&HealthStatus::Ok),
                m.version,
                m.description,
                crate::utils::format_timestamp(m.applied_at)
            );
        }
    }
    println!();

    print_stats(stats);
}

fn print_stats(stats: &CorpusStats) {
    println!("{BOLD}Statistics{RESET}");
    println!("  Words:        {:>8} total", stats.total_words);
    if stats.total_words > 0 {
        println!("                {:>8} with blob", stats.words_with_blob);
        println!("                {:>8} with definitions", stats.with_definitions);
        println!("                {:>8} with pronunciation", stats.with_pronunciation);
        println!("                {:>8} with sentences", stats.with_sentences);
    }
    for (table, rows) in &stats.table_rows {
        println!("  {DIM}{table:<22}{RESET} {rows:>8}");
    }
}

// ============================================================================
// Word display
// ============================================================================

/// Prints one stored or freshly fetched entry.
pub fn print_word(record: &WordRecord, report: &CompletenessReport) {
    let (color, label) = match report.verdict() {
        Verdict::Complete => (GREEN, "complete"),
        Verdict::PartiallyValid => (YELLOW, "partial"),
        Verdict::Invalid => (RED, "invalid"),
    };
    println!("{BOLD}{}{RESET}  {color}[{label}]{RESET}", record.word);

    for (accent, p) in record.pronunciation.iter() {
        println!("  {DIM}{accent}{RESET} {}", p.phonetic);
    }

    for def in &record.definitions.basic {
        println!("  {} {}", def.part_of_speech, def.meaning);
    }
    for def in &record.definitions.web {
        println!("  {DIM}web{RESET} {}", def.meaning);
    }
    for entry in &record.definitions.authoritative {
        println!("  {BOLD}{}{RESET}", entry.part_of_speech);
        for sense in &entry.definitions {
            println!(
                "    {}. {} {DIM}{}{RESET}",
                sense.number, sense.chinese_meaning, sense.english_meaning
            );
        }
        for idiom in &entry.idioms {
            println!("    {DIM}idiom{RESET} {}: {}", idiom.title, idiom.meaning);
        }
    }
    if !record.sentences.is_empty() {
        println!("  {DIM}{} example sentence(s){RESET}", record.sentences.len());
    }
    if !record.word_forms.is_empty() {
        let forms: Vec<String> = record
            .word_forms
            .iter()
            .map(|f| format!("{} {}", f.form_type, f.word))
            .collect();
        println!("  {DIM}forms: {}{RESET}", forms.join(", "));
    }

    for issue in &report.issues {
        println!("  {YELLOW}!{RESET} {issue}");
    }
}

// ============================================================================
// Audit / repair / migration reports
// ============================================================================

pub fn print_audit_report(report: &AuditReport) {
    println!("{BOLD}Audit{RESET}");
    println!();
    println!(
        "  Integrity score: {}{BOLD}{}{RESET}/100",
        score_color(report.score),
        report.score
    );
    println!(
        "  Findings: {} critical, {} high, {} medium",
        report.count_by_severity(Severity::Critical),
        report.count_by_severity(Severity::High),
        report.count_by_severity(Severity::Medium)
    );
    println!();

    if report.is_clean() {
        println!("  {GREEN}\u{2713}{RESET} No findings");
    } else {
        let mut findings: Vec<_> = report.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        for finding in findings.iter().take(LIST_LIMIT) {
            println!("  {}{finding}{RESET}", severity_color(finding.severity));
        }
        if findings.len() > LIST_LIMIT {
            println!("  {DIM}... and {} more{RESET}", findings.len() - LIST_LIMIT);
        }
    }
}

pub fn print_repair_report(report: &RepairReport) {
    let title = if report.dry_run {
        "Repair (dry run)"
    } else {
        "Repair"
    };
    let verb = if report.dry_run { "would" } else { "did" };
    println!("{BOLD}{title}{RESET}");
    println!();

    if let Some(orphans) = &report.orphans {
        println!(
            "  Orphans:        {:>6} rows {DIM}({verb} remove, {} pass(es)){RESET}",
            orphans.removed, orphans.passes
        );
    }
    if let Some(r) = &report.reclassify {
        println!(
            "  Reclassified:   {:>6} of {} candidates {DIM}({} siblings, {} examples renumbered, {} skipped){RESET}",
            r.promoted, r.candidates, r.siblings_created, r.examples_renumbered, r.skipped
        );
    }
    if let Some(c) = &report.corrupt {
        println!(
            "  Corrupt rows:   {:>6} {DIM}({} pronunciations, {} definitions, {} sentences){RESET}",
            c.total(),
            c.pronunciations,
            c.definitions,
            c.sentences
        );
    }
    if let Some(summary) = &report.backfill {
        println!(
            "  Backfill:       {:>6} words {DIM}({} succeeded, {} skipped, {} failed){RESET}",
            if summary.dry_run {
                summary.targets.len()
            } else {
                summary.counts.processed
            },
            summary.counts.succeeded,
            summary.counts.skipped,
            summary.counts.failed
        );
    }

    print_failures(
        report
            .failures
            .iter()
            .map(|f| format!("{} {}: {}", f.operation, f.target, f.message)),
    );
}

pub fn print_migration_summary(summary: &MigrationSummary) {
    if summary.dry_run {
        println!("{BOLD}Migration plan{RESET}");
        println!();
        println!("Words to migrate: {BOLD}{}{RESET}", summary.targets.len());
        for word in summary.targets.iter().take(LIST_LIMIT) {
            println!("  {DIM}- {word}{RESET}");
        }
        if summary.targets.len() > LIST_LIMIT {
            println!("  {DIM}... and {} more{RESET}", summary.targets.len() - LIST_LIMIT);
        }
        return;
    }

    println!();
    println!("{BOLD}Migration complete{RESET}");
    let counts = &summary.counts;
    println!("  {GREEN}\u{2713}{RESET} Migrated: {}", counts.succeeded);
    if counts.skipped > 0 {
        println!("  {DIM}-{RESET} Skipped:  {}", counts.skipped);
    }
    if counts.failed > 0 {
        println!("  {RED}\u{2717}{RESET} Failed:   {}", counts.failed);
    }
    println!("  {DIM}Elapsed: {}{RESET}", format_duration(summary.elapsed));
    if summary.cancelled {
        println!("  {YELLOW}Cancelled before finishing{RESET}");
    }
    if summary.aborted {
        println!("  {YELLOW}Aborted on first failure{RESET}");
    }

    print_failures(summary.failures.iter().map(|f| {
        let facets: Vec<&str> = f.facets.iter().map(|facet| facet.as_str()).collect();
        format!("{} [{}]: {}", f.word, facets.join(", "), f.message)
    }));
}

fn print_failures(failures: impl Iterator<Item = String>) {
    let failures: Vec<String> = failures.collect();
    if failures.is_empty() {
        return;
    }
    println!();
    println!("{YELLOW}Errors:{RESET}");
    for failure in failures.iter().take(LIST_LIMIT) {
        println!("  - {failure}");
    }
    if failures.len() > LIST_LIMIT {
        println!("  {DIM}... and {} more{RESET}", failures.len() - LIST_LIMIT);
    }
}

/// Formats a duration as `1h02m03s`, `2m05s` or `4.2s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m{:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Prints migration progress to stderr, one line per word.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressPrinter;

impl ProgressObserver for ProgressPrinter {
    fn on_event(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::Started {
                total_words,
                batches,
                dry_run: false,
            } => eprintln!("Migrating {total_words} word(s) in {batches} batch(es)"),
            MigrationEvent::BatchStarted { batch, batches, size } => {
                eprintln!("{DIM}batch {batch}/{batches} ({size} words){RESET}")
            }
            MigrationEvent::WordFailed { word, message, .. } => {
                eprintln!("  {RED}\u{2717}{RESET} {word}: {message}")
            }
            MigrationEvent::Progress(snapshot) => {
                let eta = snapshot
                    .eta
                    .map(format_duration)
                    .unwrap_or_else(|| "?".to_string());
                let rate = snapshot
                    .words_per_minute
                    .map(|wpm| format!("{wpm:.0}/min"))
                    .unwrap_or_else(|| "-".to_string());
                eprint!(
                    "\r  {}/{} ({:.0}%)  {rate}  eta {eta}   ",
                    snapshot.processed,
                    snapshot.total,
                    snapshot.percent()
                );
                let _ = io::stderr().flush();
            }
            MigrationEvent::Finished { .. } => eprintln!(),
            _ => {}
        }
    }
}

/// Prompts user for confirmation.
pub fn confirm(prompt: &str) -> bool {
    print!("\n{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
