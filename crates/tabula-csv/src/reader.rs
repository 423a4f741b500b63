//! CSV reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::batch::ImportBatch;
use crate::error::{CsvError, CsvResult};
use crate::options::CsvReadOptions;

/// CSV file reader
pub struct CsvReader;

impl CsvReader {
    /// Read a CSV file into an import batch
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<ImportBatch> {
        let path = path.as_ref();
        log::debug!("reading CSV from {}", path.display());
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read CSV from a reader into an import batch
    ///
    /// The first record is the header row. Short rows are padded with empty
    /// fields; a row with a non-empty field past the last header is an error.
    pub fn read<R: Read>(reader: R, options: &CsvReadOptions) -> CsvResult<ImportBatch> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(true)
            .flexible(true)
            .trim(if options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(CsvError::Parse {
                row: 1,
                column: 1,
                message: "missing header row".to_string(),
            });
        }
        for (i, header) in headers.iter().enumerate() {
            if headers[..i].contains(header) {
                return Err(CsvError::Parse {
                    row: 1,
                    column: i + 1,
                    message: format!("duplicate header '{}'", header),
                });
            }
        }

        let width = headers.len();
        let mut batch = ImportBatch::new(headers);
        let mut skipped = 0usize;

        for (index, result) in csv_reader.records().enumerate() {
            let record = result?;
            let row = index + 2;

            if let Some(extra) = record.iter().skip(width).position(|f| !f.is_empty()) {
                return Err(CsvError::Parse {
                    row,
                    column: width + extra + 1,
                    message: "field has no matching header".to_string(),
                });
            }

            let mut fields: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            if options.skip_blank_rows && fields.iter().all(|f| f.is_empty()) {
                skipped += 1;
                continue;
            }
            fields.resize(width, String::new());
            batch.push_row(fields);
        }

        if skipped > 0 {
            log::debug!("skipped {} blank rows", skipped);
        }
        log::info!("read {} rows with {} columns", batch.len(), width);
        Ok(batch)
    }
}
