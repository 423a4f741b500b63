//! Parsed import data

/// Header names plus one record per data row, all as raw strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ImportBatch {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a data row
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate `(header, value)` pairs of a row
    pub fn fields<'a>(&'a self, row: &'a [String]) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(row.iter().map(String::as_str))
    }
}
