use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::SourceName;

/// Error type for schema, source IO, and chunk persistence failures.
#[derive(Debug, Error)]
pub enum FlatfileError {
    #[error("source '{feature_type}' is missing required column '{column}'")]
    SchemaMismatch {
        feature_type: SourceName,
        column: String,
    },
    #[error("source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: SourceName, reason: String },
    #[error("no recognised address tables found under {}", dir.display())]
    NoSourceTables { dir: PathBuf },
    #[error("chunk artifact {} was not written: {reason}", artifact.display())]
    PartialChunkWrite { artifact: PathBuf, reason: String },
    #[error("output artifact {} could not be read: {reason}", path.display())]
    OutputUnreadable { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}
