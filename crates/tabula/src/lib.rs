//! # tabula
//!
//! User-defined tables with computed formula columns.
//!
//! Tabula lets an administrator define tables with typed columns, fill them
//! row by row, and attach simple arithmetic formulas to number columns. A
//! formula like `Width * 2` is compiled into steps once and evaluated per row;
//! saving a cell recomputes every formula that reads it.
//!
//! ## Features
//!
//! - Schema authoring with nine column types and select options
//! - Left-to-right formulas over `+ - * / sqrt %`
//! - Cached computed values with a TTL
//! - Dependency cascades, inline or on a tokio task
//! - Bulk import from CSV
//!
//! ## Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let engine = Engine::new();
//! let table = engine.create_table("Rooms");
//! let width = engine.add_column(table.id, "Width", DataType::Number).unwrap();
//! let area = engine.add_column(table.id, "Area", DataType::Number).unwrap();
//! engine.set_formula(area.id, "Width * 2").unwrap();
//!
//! let row = engine.create_table_api(table.id, None).unwrap();
//! engine.save_cell(row.id, width.id, "3").unwrap();
//! let cell = engine.store().find_cell(row.id, area.id).unwrap();
//! assert_eq!(cell.value, "6.0");
//! ```

pub mod cascade;
pub mod engine;
pub mod error;
pub mod import;
pub mod options;
pub mod prelude;
pub mod scheduler;

pub use cascade::{CascadeContext, CascadeJob, CascadeRunner, CascadeStats};
pub use engine::{Engine, FormulaUpdate};
pub use error::{Error, Result};
pub use import::ImportReport;
pub use options::{CascadePolicy, EngineOptions, ImportOptions};
pub use scheduler::{BackgroundScheduler, CascadeScheduler, InlineScheduler};

// Re-export core types
pub use tabula_core::{
    Cell, CellId, Column, ColumnId, DataType, FormulaOperand, FormulaStep, Operation,
    OperationCatalog, OperationKind, SelectOption, Store, Table, TableApi, TableApiId, TableId,
};

// Re-export formula types
pub use tabula_formula::{
    format_number, CompiledFormula, FormulaError, ValidationIssue, ValueCache,
};

// Re-export I/O types
pub use tabula_csv::{CsvError, CsvReadOptions, CsvReader, CsvWriteOptions, CsvWriter, ImportBatch};
