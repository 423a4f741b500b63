//! CSV writer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};

/// CSV file writer
pub struct CsvWriter;

impl CsvWriter {
    /// Write rows to a CSV file
    pub fn write_file<P: AsRef<Path>>(
        headers: &[String],
        rows: &[Vec<String>],
        path: P,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let path = path.as_ref();
        log::debug!("writing {} rows to {}", rows.len(), path.display());
        let file = File::create(path)?;
        Self::write(headers, rows, file, options)
    }

    /// Write rows to a writer
    pub fn write<W: Write>(
        headers: &[String],
        rows: &[Vec<String>],
        writer: W,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .flexible(true)
            .from_writer(writer);

        if options.write_header {
            csv_writer.write_record(headers)?;
        }
        for row in rows {
            csv_writer.write_record(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}
