//! Error taxonomy for the analytics engine.
//!
//! Every variant carries structured detail (offending columns, row, value,
//! dataset id) so callers can build their own messages.

use thiserror::Error;

use crate::model::DatasetId;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// One or more required columns are absent from the header.
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A numeric cell could not be parsed. `row` is the zero-based data row.
    #[error("row {row}: column '{column}' is not numeric: {value:?}")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },

    /// Absent and foreign datasets are reported identically.
    #[error("dataset {id} not found")]
    NotFound { id: DatasetId },

    /// Stored table/summary pairing is broken.
    #[error("dataset {}: consistency violation: {detail}", display_id(.id))]
    Consistency {
        id: Option<DatasetId>,
        detail: String,
    },

    /// Input could not be read as delimited text at all.
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("store: {0}")]
    Store(#[from] rusqlite::Error),

    /// Local file could not be opened or read.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

fn display_id(id: &Option<DatasetId>) -> String {
    id.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Parse,
    NotFound,
    Consistency,
    Malformed,
    Store,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Schema => "schema",
            ErrorKind::Parse => "parse",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Consistency => "consistency",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Store => "store",
            ErrorKind::Io => "io",
        }
    }

    /// Schema, parse and malformed-input errors can be fixed by re-uploading.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, ErrorKind::Schema | ErrorKind::Parse | ErrorKind::Malformed)
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Schema { .. } => ErrorKind::Schema,
            EngineError::Parse { .. } => ErrorKind::Parse,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Consistency { .. } => ErrorKind::Consistency,
            EngineError::Malformed(_) => ErrorKind::Malformed,
            EngineError::Store(_) => ErrorKind::Store,
            EngineError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn consistency(id: Option<DatasetId>, detail: impl Into<String>) -> Self {
        EngineError::Consistency {
            id,
            detail: detail.into(),
        }
    }
}
