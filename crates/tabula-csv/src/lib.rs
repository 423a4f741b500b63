//! # tabula-csv
//!
//! CSV import and export for tabula tables.
//!
//! Reading produces an [`ImportBatch`]: a header row naming columns and one
//! string record per data row. Writing takes header names and rows of display
//! values.

mod batch;
mod error;
mod options;
mod reader;
mod writer;

pub use batch::ImportBatch;
pub use error::{CsvError, CsvResult};
pub use options::{CsvReadOptions, CsvWriteOptions, LineTerminator};
pub use reader::CsvReader;
pub use writer::CsvWriter;
