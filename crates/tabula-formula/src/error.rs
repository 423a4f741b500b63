//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula compilation or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula text could not be compiled
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("{0}")]
    Evaluation(String),

    /// A formula reached its own column again while evaluating
    #[error("Circular reference detected at column '{0}'")]
    CircularReference(String),

    /// Only number columns carry formulas
    #[error("Column '{0}' is not a number column and cannot hold a formula")]
    NotAFormulaColumn(String),

    /// Formula text failed validation
    #[error("Invalid formula: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Store or model error
    #[error(transparent)]
    Core(#[from] tabula_core::Error),
}

impl FormulaError {
    /// Create an evaluation error
    pub fn evaluation<S: Into<String>>(msg: S) -> Self {
        FormulaError::Evaluation(msg.into())
    }
}
