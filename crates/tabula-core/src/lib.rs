//! # tabula-core
//!
//! Core data structures for the tabula formula platform.
//!
//! This crate provides the fundamental types used throughout tabula:
//! - [`Table`], [`Column`] and [`DataType`] - user-defined schemas
//! - [`TableApi`] and [`Cell`] - filled instances and their values
//! - [`FormulaStep`], [`FormulaOperand`] and the [`OperationCatalog`] - compiled formulas
//! - [`Store`] - the shared repository holding all of the above
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{Cell, DataType, Store};
//!
//! let store = Store::new();
//! let table = store.create_table("Rooms");
//! let width = store.add_column(table.id, "Width", DataType::Number).unwrap();
//!
//! let row = store.create_table_api(table.id, None).unwrap();
//! store.insert_cell(Cell::new(row.id, width.id, "3")).unwrap();
//! assert_eq!(store.find_cell(row.id, width.id).unwrap().value, "3");
//! ```

pub mod cell;
pub mod column;
pub mod error;
pub mod formula;
pub mod id;
pub mod store;
pub mod table;
pub mod validation;

// Re-exports for convenience
pub use cell::Cell;
pub use column::{Column, DataType, SelectOption};
pub use error::{Error, Result};
pub use formula::{Arity, FormulaOperand, FormulaStep, Operation, OperationCatalog, OperationKind};
pub use id::{CellId, ColumnId, OptionId, StepId, TableApiId, TableId};
pub use store::Store;
pub use table::{Table, TableApi};
pub use validation::{check_required, parse_checkbox, validate_value};

pub use rust_decimal::Decimal;
