use thiserror::Error;

use crate::data::model::ColumnType;

// ---------------------------------------------------------------------------
// Pipeline errors (filter / aggregate / chart / form validation)
// ---------------------------------------------------------------------------

/// Errors raised by the pure data pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{column}' is {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: ColumnType,
    },

    /// A row does not conform to the declared schema.
    #[error("row {row}: {detail}")]
    RowShape { row: usize, detail: String },

    /// Required input missing or out of bounds (data-entry form).
    #[error("{0}")]
    Validation(String),

    #[error("unsupported chart kind: {0}")]
    UnsupportedChart(String),

    #[error("invalid aggregate request: {0}")]
    InvalidSpec(String),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors raised by the SQLite-backed [`TabularStore`](crate::store::TabularStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("table '{0}' not found")]
    NotFound(String),

    #[error("table '{table}', column '{column}': {detail}")]
    SchemaMismatch {
        table: String,
        column: String,
        detail: String,
    },

    #[error(transparent)]
    Data(#[from] DataError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
