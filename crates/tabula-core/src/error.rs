//! Error types for tabula-core

use thiserror::Error;

use crate::column::DataType;
use crate::id::{CellId, ColumnId, TableApiId, TableId};

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tabula-core
#[derive(Debug, Error)]
pub enum Error {
    /// Table id not present in the store
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    /// Column id not present in the store
    #[error("Column not found: {0}")]
    ColumnNotFound(ColumnId),

    /// No column with this name in the table
    #[error("Column '{name}' not found in table {table}")]
    ColumnNameNotFound { table: TableId, name: String },

    /// Table api id not present in the store
    #[error("Table api not found: {0}")]
    TableApiNotFound(TableApiId),

    /// Cell id not present in the store
    #[error("Cell not found: {0}")]
    CellNotFound(CellId),

    /// Column names are unique within a table
    #[error("Column name already exists in table: {0}")]
    DuplicateColumnName(String),

    /// At most one cell per (table api, column)
    #[error("Cell already exists for column {column} in table api {table_api}")]
    DuplicateCell {
        table_api: TableApiId,
        column: ColumnId,
    },

    /// Column and table api belong to different tables
    #[error("Column {column} does not belong to the table of table api {table_api}")]
    ColumnTableMismatch {
        table_api: TableApiId,
        column: ColumnId,
    },

    /// Unknown data type name
    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    /// Value does not fit the column's data type
    #[error("Invalid value '{value}' for data type {data_type}")]
    InvalidValue { data_type: DataType, value: String },

    /// Value is not one of the select column's options
    #[error("Value '{value}' is not a valid option for column '{column}'")]
    InvalidOption { column: String, value: String },

    /// Required cell left blank
    #[error("Value is required for data type {0}")]
    ValueRequired(DataType),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
