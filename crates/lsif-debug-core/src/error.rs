//! Structural errors.
//!
//! These abort processing of the current file. Recoverable, per-record problems
//! are reported through [`crate::Diagnostics`] instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::element::Id;

pub type Result<T> = std::result::Result<T, LsifError>;

#[derive(Debug, Error)]
pub enum LsifError {
    /// A line that is not a graph element, even after control-character repair.
    #[error("malformed record on line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// `record` is the 1-based position among non-blank records.
    #[error("duplicate id {id} in record {record}")]
    DuplicateId { id: Id, record: usize },

    /// An edge (or `$event`) referring to an id that has not been declared yet.
    #[error("unknown id {id} referenced by `{field}` in record {record}")]
    UnknownId {
        id: Id,
        field: &'static str,
        record: usize,
    },

    /// Offsetting an identifier would leave the `u64` id space.
    #[error("id {id} overflows when offset by {offset}")]
    IdOverflow { id: Id, offset: Id },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid path {path}: {message}")]
    InvalidPath { path: PathBuf, message: String },
}

impl LsifError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
