use std::io;
use std::path::PathBuf;

/// Errors raised while migrating runtime files.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The original was already deleted when the rename failed. Only the
    /// temp copy survives.
    #[error("{original} was removed but {temp} could not be renamed into place: {source}")]
    ReplaceInterrupted {
        original: PathBuf,
        temp: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MigrateError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        MigrateError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Fatal errors abort the whole run; everything else only affects one file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::ReplaceInterrupted { .. } | MigrateError::Report { .. }
        )
    }
}
