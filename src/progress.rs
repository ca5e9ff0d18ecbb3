use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::commands::migration::FileOutcome;
use crate::error::MigrateError;

/// Outcome counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub migrated: usize,
    pub would_migrate: usize,
    pub skipped: usize,
    pub format_errors: usize,
    pub mismatches: usize,
    pub failed: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Serialize)]
struct RunReport<'a> {
    tool_version: &'static str,
    started_at: String,
    elapsed_secs: f64,
    root: String,
    dry_run: bool,
    totals: &'a Totals,
    files: &'a [FileRecord],
}

/// Collects per-file outcomes while the tree is processed.
pub struct RunSummary {
    start_time: Instant,
    started_at: DateTime<Local>,
    root: PathBuf,
    dry_run: bool,
    totals: Totals,
    files: Vec<FileRecord>,
}

impl RunSummary {
    pub fn new(root: &Path, dry_run: bool) -> Self {
        Self {
            start_time: Instant::now(),
            started_at: Local::now(),
            root: root.to_path_buf(),
            dry_run,
            totals: Totals::default(),
            files: Vec::new(),
        }
    }

    pub fn record(&mut self, file: &Path, outcome: FileOutcome) {
        let t = &mut self.totals;
        match &outcome {
            FileOutcome::Migrated { rows } => {
                t.migrated += 1;
                t.rows += rows;
            }
            FileOutcome::WouldMigrate { rows } => {
                t.would_migrate += 1;
                t.rows += rows;
            }
            FileOutcome::SkippedNewFormat | FileOutcome::SkippedSymlink => t.skipped += 1,
            FileOutcome::FormatError { .. } => t.format_errors += 1,
            FileOutcome::HeadlineMismatch => t.mismatches += 1,
            FileOutcome::Failed { .. } => t.failed += 1,
        }
        self.files.push(FileRecord {
            path: file.display().to_string(),
            outcome,
        });
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// One-line summary printed after the completion banner.
    pub fn finish(&self) {
        let t = self.totals();
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let changed = if self.dry_run {
            format!("would migrate {}", t.would_migrate)
        } else {
            format!("migrated {}", t.migrated)
        };
        println!(
            "📊 {} files: {} ({} rows) | skipped {} | format errors {} | mismatches {} | failed {} | {:.1}s",
            self.files().len(),
            changed,
            t.rows,
            t.skipped,
            t.format_errors,
            t.mismatches,
            t.failed,
            elapsed
        );
    }

    /// Write the per-file detail of the run as JSON to `path`.
    pub fn write_report(&self, path: &Path) -> Result<(), MigrateError> {
        let report_err = |source: io::Error| MigrateError::Report {
            path: path.to_path_buf(),
            source,
        };
        let report = RunReport {
            tool_version: env!("RUNTIME_CSV_MIGRATE_VERSION"),
            started_at: self.started_at.to_rfc3339(),
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
            root: self.root.display().to_string(),
            dry_run: self.dry_run,
            totals: &self.totals,
            files: &self.files,
        };

        let file = File::create(path).map_err(report_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &report).map_err(|e| report_err(e.into()))?;
        writer.write_all(b"\n").map_err(report_err)?;
        writer.flush().map_err(report_err)?;
        Ok(())
    }
}
