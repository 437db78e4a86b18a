use std::path::{Path, PathBuf};

use themesmith_core::data_dump::DumpError;
use themesmith_core::error::CoreError;

/// Errors raised while importing, exporting or applying a theme.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The themes root holds no usable theme.
    #[error("{0}")]
    NoThemes(&'static str),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ThemeError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type ThemeResult<T> = Result<T, ThemeError>;
