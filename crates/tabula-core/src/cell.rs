//! Cell type

use chrono::{DateTime, Utc};

use crate::id::{CellId, ColumnId, TableApiId};

/// One column's value within one table api
///
/// `value` is the raw or materialized string. For formula columns it holds the
/// last value persisted by a cascade; the live value comes from the evaluator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub id: CellId,
    pub table_api: TableApiId,
    pub column: ColumnId,
    pub value: String,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
}

impl Cell {
    /// Create a new required cell
    pub fn new(table_api: TableApiId, column: ColumnId, value: impl Into<String>) -> Self {
        Self {
            id: CellId::new(),
            table_api,
            column,
            value: value.into(),
            is_required: true,
            created_at: Utc::now(),
        }
    }

    /// Create an empty, optional cell
    pub fn empty(table_api: TableApiId, column: ColumnId) -> Self {
        Self {
            is_required: false,
            ..Self::new(table_api, column, String::new())
        }
    }

    /// Set whether a value is required
    pub fn with_required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell() {
        let cell = Cell::empty(TableApiId::new(), ColumnId::new());
        assert!(cell.value.is_empty());
        assert!(!cell.is_required);
    }

    #[test]
    fn test_with_required() {
        let cell = Cell::new(TableApiId::new(), ColumnId::new(), "3").with_required(false);
        assert_eq!(cell.value, "3");
        assert!(!cell.is_required);
    }
}
