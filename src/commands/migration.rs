use std::fs;
use std::path::Path;
use std::process;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use crate::commands::header_ops::{classify_header, HeaderClass};
use crate::commands::row_ops::reorder_row;
use crate::error::MigrateError;
use crate::file_utils::{remove_stale, replace_file, scan_subtree, temp_path_for};
use crate::models::{expected_columns, MAPPING, NEW_QUOTED, RUNTIME_CSV};
use crate::progress::RunSummary;

/// What happened to a single scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Migrated { rows: usize },
    WouldMigrate { rows: usize },
    SkippedNewFormat,
    SkippedSymlink,
    FormatError { detail: String },
    HeadlineMismatch,
    Failed { error: String },
}

impl FileOutcome {
    pub fn status_line(&self, file: &Path) -> String {
        let path = file.display();
        match self {
            FileOutcome::Migrated { .. } => format!("--> MIG                  : {}", path),
            FileOutcome::WouldMigrate { .. } => format!("--> MIG (dry run)        : {}", path),
            FileOutcome::SkippedNewFormat => format!("... skip (new format)    : {}", path),
            FileOutcome::SkippedSymlink => format!("... skip (symlink)       : {}", path),
            FileOutcome::FormatError { detail } => {
                format!("!!! WARNING format error : {} ({})", path, detail)
            }
            FileOutcome::HeadlineMismatch => format!("!!! Headline mismatch    : {}", path),
            FileOutcome::Failed { error } => format!("!!! ERROR                : {} ({})", path, error),
        }
    }
}

enum Content {
    Eligible(Vec<StringRecord>),
    Rejected(FileOutcome),
}

/// Walk `root` and run [`maybe_migrate`] on every runtime file, one at a time.
///
/// Per-file problems are printed and recorded in `summary`. Only a fatal
/// error (interrupted replace) stops the walk and is returned.
pub fn migrate_runtime_data(
    root: &Path,
    dry_run: bool,
    summary: &mut RunSummary,
) -> Result<(), MigrateError> {
    for entry in scan_subtree(root, &RUNTIME_CSV) {
        let file = match entry {
            Ok(file) => file,
            Err(e) => {
                let at = e.path().unwrap_or(root).to_path_buf();
                warn!(path = %at.display(), error = %e, "directory traversal failed");
                let outcome = FileOutcome::Failed {
                    error: e.to_string(),
                };
                println!("{}", outcome.status_line(&at));
                summary.record(&at, outcome);
                continue;
            }
        };

        // rewriting through a link would replace it with a plain file
        if file.is_symlink() {
            let outcome = FileOutcome::SkippedSymlink;
            println!("{}", outcome.status_line(&file));
            summary.record(&file, outcome);
            continue;
        }

        let outcome = match maybe_migrate(&file, dry_run) {
            Ok(outcome) => outcome,
            Err(e) if !e.is_fatal() => {
                warn!(path = %file.display(), error = %e, "migration failed");
                FileOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(e) => {
                let outcome = FileOutcome::Failed {
                    error: e.to_string(),
                };
                println!("{}", outcome.status_line(&file));
                summary.record(&file, outcome);
                return Err(e);
            }
        };
        println!("{}", outcome.status_line(&file));
        summary.record(&file, outcome);
    }
    Ok(())
}

/// Migrate one runtime file in place if its headline is the old one.
///
/// Files with the new headline, a foreign headline or rows of the wrong
/// width are left untouched. An eligible file is rewritten into
/// `<name>.tmp<pid>` next to it, which then replaces the original.
pub fn maybe_migrate(file: &Path, dry_run: bool) -> Result<FileOutcome, MigrateError> {
    let rows = match read_content(file)? {
        Content::Eligible(rows) => rows,
        Content::Rejected(outcome) => return Ok(outcome),
    };
    let count = rows.len();
    if dry_run {
        return Ok(FileOutcome::WouldMigrate { rows: count });
    }

    let temp = temp_path_for(file, process::id());
    remove_stale(&temp)?;
    if let Err(e) = write_migrated(&temp, &rows) {
        discard_temp(&temp);
        return Err(e);
    }
    drop(rows);

    debug!(path = %file.display(), temp = %temp.display(), rows = count, "replacing original");
    if let Err(e) = replace_file(&temp, file) {
        if !e.is_fatal() {
            discard_temp(&temp);
        }
        return Err(e);
    }
    Ok(FileOutcome::Migrated { rows: count })
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read the whole file; quotes are plain characters, not CSV quoting.
fn read_content(file: &Path) -> Result<Content, MigrateError> {
    let bytes = fs::read(file).map_err(|e| MigrateError::io(file, e))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(bytes.as_slice());
    let mut records = rdr.records();

    let header = records
        .next()
        .transpose()
        .map_err(|e| MigrateError::csv(file, e))?;
    let mut class = classify_header(header.as_ref());
    // the csv reader drops a leading BOM; on disk it belongs to the first label
    if bytes.starts_with(UTF8_BOM) && !matches!(class, HeaderClass::LengthMismatch { .. }) {
        class = HeaderClass::HeaderMismatch;
    }
    match class {
        HeaderClass::EligibleForMigration => {}
        HeaderClass::AlreadyMigrated => return Ok(Content::Rejected(FileOutcome::SkippedNewFormat)),
        HeaderClass::HeaderMismatch => return Ok(Content::Rejected(FileOutcome::HeadlineMismatch)),
        HeaderClass::LengthMismatch { found } => {
            return Ok(Content::Rejected(FileOutcome::FormatError {
                detail: format!("headline has {} fields, expected {}", found, expected_columns()),
            }))
        }
    }

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| MigrateError::csv(file, e))?;
        if record.len() != expected_columns() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Ok(Content::Rejected(FileOutcome::FormatError {
                detail: format!(
                    "line {} has {} fields, expected {}",
                    line,
                    record.len(),
                    expected_columns()
                ),
            }));
        }
        rows.push(record);
    }
    debug!(path = %file.display(), rows = rows.len(), "old headline, eligible");
    Ok(Content::Eligible(rows))
}

/// New headline plus every row in new column order. The handle is synced and
/// closed before returning.
fn write_migrated(temp: &Path, rows: &[StringRecord]) -> Result<(), MigrateError> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_path(temp)
        .map_err(|e| MigrateError::csv(temp, e))?;

    wtr.write_record(NEW_QUOTED.iter())
        .map_err(|e| MigrateError::csv(temp, e))?;
    for row in rows {
        let fields: Vec<&str> = row.iter().collect();
        wtr.write_record(reorder_row(fields, &MAPPING))
            .map_err(|e| MigrateError::csv(temp, e))?;
    }

    wtr.flush().map_err(|e| MigrateError::io(temp, e))?;
    let file = wtr
        .into_inner()
        .map_err(|e| MigrateError::io(temp, e.into_error()))?;
    file.sync_all().map_err(|e| MigrateError::io(temp, e))?;
    Ok(())
}

fn discard_temp(temp: &Path) {
    if let Err(e) = fs::remove_file(temp) {
        if temp.exists() {
            warn!(temp = %temp.display(), error = %e, "could not remove temp file");
        }
    }
}
