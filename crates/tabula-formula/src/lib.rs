//! # tabula-formula
//!
//! Formula compiler and evaluator for tabula tables.
//!
//! This crate provides:
//! - Tokenizing formula text ([`tokenizer`])
//! - Compiling text into persisted steps ([`compile`], [`recompile`])
//! - Read-only checks for the schema editor ([`validate()`])
//! - Evaluating steps for a row ([`Evaluator`]) with a TTL [`ValueCache`]
//! - Column dependency tracking for cascades ([`ColumnGraph`])
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{Cell, DataType, Store};
//! use tabula_formula::{compile, Evaluator};
//!
//! let store = Store::new();
//! let table = store.create_table("Rooms");
//! let width = store.add_column(table.id, "Width", DataType::Number).unwrap();
//! let area = store.add_column(table.id, "Area", DataType::Number).unwrap();
//!
//! let compiled = compile("Width * 2", &area, &store).unwrap();
//! store.replace_steps(area.id, compiled.steps).unwrap();
//!
//! let row = store.create_table_api(table.id, None).unwrap();
//! store.insert_cell(Cell::new(row.id, width.id, "3")).unwrap();
//! let cell = store.insert_cell(Cell::empty(row.id, area.id)).unwrap();
//!
//! assert_eq!(Evaluator::new(&store).computed_value(&cell), "6.0");
//! ```

pub mod cache;
pub mod compiler;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod tokenizer;
pub mod validate;

pub use cache::{CacheStats, ValueCache, DEFAULT_CAPACITY, DEFAULT_TTL};
pub use compiler::{compile, recompile, recompile_with, ChainCompiler, CompiledFormula, FormulaCompiler};
pub use dependency::ColumnGraph;
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{format_number, Evaluator, MissingCell, ERROR_PREFIX};
pub use tokenizer::{tokenize, Token};
pub use validate::{validate, ValidationIssue};
