//! Error types for the tabula facade

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the [`Engine`](crate::Engine)
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tabula_core::Error),

    #[error(transparent)]
    Formula(#[from] tabula_formula::FormulaError),

    #[error(transparent)]
    Csv(#[from] tabula_csv::CsvError),

    /// Bulk import rejected
    #[error("Import error: {0}")]
    Import(String),

    /// Other formulas still read the column
    #[error("Column '{column}' is used by the formulas of: {}", .dependents.join(", "))]
    ColumnInUse {
        column: String,
        dependents: Vec<String>,
    },

    /// Cascade job could not be queued
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}
