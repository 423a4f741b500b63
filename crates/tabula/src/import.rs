//! Bulk import
//!
//! Loads an [`ImportBatch`] into a table: one table api per data row, one cell
//! per header. Values for number columns are normalised to float text
//! (`"3"` becomes `"3.0"`). The batch is checked in full before anything is
//! written, so a rejected import leaves the store untouched.

use std::path::Path;

use tabula_core::{Cell, Column, DataType, TableApiId, TableId};
use tabula_csv::{CsvReadOptions, CsvReader, ImportBatch};
use tabula_formula::format_number;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::options::ImportOptions;

/// Summary of an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// One per imported row, in input order
    pub table_apis: Vec<TableApiId>,
    pub cells_created: usize,
    /// Non-numeric values stored as empty (non-strict mode only)
    pub values_blanked: usize,
}

impl Engine {
    /// Import parsed rows into `table`
    pub fn import_rows(
        &self,
        table: TableId,
        batch: &ImportBatch,
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        let columns = self.match_headers(table, &batch.headers)?;

        let mut report = ImportReport::default();
        let mut prepared: Vec<Vec<String>> = Vec::with_capacity(batch.len());
        for (index, row) in batch.rows.iter().enumerate() {
            let mut values = Vec::with_capacity(columns.len());
            for (column, raw) in columns.iter().zip(row) {
                let value = match normalize_value(column, raw) {
                    Some(value) => value,
                    None if options.strict_numeric => {
                        return Err(Error::Import(format!(
                            "Invalid numeric value \"{}\" in column \"{}\" at row {}",
                            raw,
                            column.name,
                            index + 2
                        )));
                    }
                    None => {
                        report.values_blanked += 1;
                        String::new()
                    }
                };
                values.push(value);
            }
            prepared.push(values);
        }

        for values in prepared {
            let api = self.create_table_api(table, None)?;
            let mut cells = Vec::with_capacity(values.len());
            for (column, value) in columns.iter().zip(values) {
                let cell = self
                    .store()
                    .insert_cell(Cell::new(api.id, column.id, value).with_required(false))?;
                cells.push(cell.id);
            }
            // Cascades run once the whole row is present
            report.cells_created += cells.len();
            for cell in cells {
                self.schedule_cascade(cell)?;
            }
            report.table_apis.push(api.id);
        }

        tracing::info!(
            rows = report.table_apis.len(),
            cells = report.cells_created,
            blanked = report.values_blanked,
            "import finished"
        );
        Ok(report)
    }

    /// Read a CSV file and import it into `table`
    pub fn import_csv<P: AsRef<Path>>(
        &self,
        table: TableId,
        path: P,
        csv_options: &CsvReadOptions,
        options: &ImportOptions,
    ) -> Result<ImportReport> {
        let batch = CsvReader::read_file(path, csv_options)?;
        self.import_rows(table, &batch, options)
    }

    fn match_headers(&self, table: TableId, headers: &[String]) -> Result<Vec<Column>> {
        let mut columns = Vec::with_capacity(headers.len());
        let mut unmatched = Vec::new();
        for header in headers {
            match self.store().column_by_name(table, header) {
                Some(column) => columns.push(column),
                None => unmatched.push(header.as_str()),
            }
        }
        if !unmatched.is_empty() {
            return Err(Error::Import(format!(
                "Columns [{}] do not match any column of the table",
                unmatched.join(", ")
            )));
        }
        Ok(columns)
    }
}

/// Value to store, or `None` for a non-numeric value in a number column
fn normalize_value(column: &Column, raw: &str) -> Option<String> {
    if raw.is_empty() || column.data_type != DataType::Number {
        return Some(raw.to_string());
    }
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        return Some(String::new());
    }
    trimmed.parse::<f64>().ok().map(format_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column(data_type: DataType) -> Column {
        Column::new(TableId::new(), "Field", data_type)
    }

    #[test]
    fn test_normalize_value() {
        let number = column(DataType::Number);
        assert_eq!(normalize_value(&number, "3").as_deref(), Some("3.0"));
        assert_eq!(normalize_value(&number, " 2.50 ").as_deref(), Some("2.5"));
        assert_eq!(normalize_value(&number, "").as_deref(), Some(""));
        assert_eq!(normalize_value(&number, "NaN").as_deref(), Some(""));
        assert_eq!(normalize_value(&number, "n/a"), None);

        let text = column(DataType::Text);
        assert_eq!(normalize_value(&text, " n/a ").as_deref(), Some(" n/a "));
    }
}
