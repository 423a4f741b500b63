//! Prelude module - common imports for tabula users
//!
//! ```rust
//! use tabula::prelude::*;
//! ```

pub use crate::{
    // Cascade types
    CascadePolicy,
    Cell,
    Column,
    CsvReadOptions,
    CsvReader,
    CsvWriteOptions,
    CsvWriter,
    DataType,
    // Main types
    Engine,
    EngineOptions,
    // Error types
    Error,
    FormulaError,
    ImportBatch,
    ImportOptions,
    OperationCatalog,
    Result,
    Table,
    TableApi,
    ValidationIssue,
};
