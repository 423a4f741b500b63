//! Column types

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::id::{ColumnId, OptionId, TableId};

/// Data type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DataType {
    Number,
    Text,
    Email,
    Date,
    Checkbox,
    Textarea,
    File,
    Image,
    Select,
}

impl DataType {
    /// All data types, in display order
    pub const ALL: [DataType; 9] = [
        DataType::Number,
        DataType::Text,
        DataType::Email,
        DataType::Date,
        DataType::Checkbox,
        DataType::Textarea,
        DataType::File,
        DataType::Image,
        DataType::Select,
    ];

    /// Lowercase name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Number => "number",
            DataType::Text => "text",
            DataType::Email => "email",
            DataType::Date => "date",
            DataType::Checkbox => "checkbox",
            DataType::Textarea => "textarea",
            DataType::File => "file",
            DataType::Image => "image",
            DataType::Select => "select",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            DataType::Number => "Number",
            DataType::Text => "Text",
            DataType::Email => "Email",
            DataType::Date => "Date",
            DataType::Checkbox => "Checkbox",
            DataType::Textarea => "Textarea",
            DataType::File => "File",
            DataType::Image => "Image",
            DataType::Select => "Select",
        }
    }

    /// File and image cells carry an upload reference instead of a typed value
    pub fn is_upload(&self) -> bool {
        matches!(self, DataType::File | DataType::Image)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| Error::InvalidDataType(s.to_string()))
    }
}

/// A column of a user-defined table
///
/// Only `number` columns may be computed from a formula. The formula source is
/// kept verbatim in `formula_text`; the compiled steps live in the store.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    pub id: ColumnId,
    pub table: TableId,
    /// Unique within the table; this is the identifier formulas use
    pub name: String,
    pub data_type: DataType,
    pub formula_text: Option<String>,
    /// Bumped every time the formula is recompiled
    pub generation: u64,
}

impl Column {
    /// Create a new column with no formula
    pub fn new(table: TableId, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: ColumnId::new(),
            table,
            name: name.into(),
            data_type,
            formula_text: None,
            generation: 0,
        }
    }

    /// Check if this column can carry a formula
    pub fn accepts_formula(&self) -> bool {
        self.data_type == DataType::Number
    }

    /// Check if this column has formula source text
    pub fn has_formula(&self) -> bool {
        self.formula_text
            .as_deref()
            .map_or(false, |text| !text.trim().is_empty())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.data_type)
    }
}

/// One allowed value of a `select` column
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectOption {
    pub id: OptionId,
    pub column: ColumnId,
    pub value: String,
}

impl SelectOption {
    pub fn new(column: ColumnId, value: impl Into<String>) -> Self {
        Self {
            id: OptionId::new(),
            column,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_round_trip_names() {
        for dt in DataType::ALL {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
        }
        assert!("decimal".parse::<DataType>().is_err());
        assert!("Number".parse::<DataType>().is_err());
    }

    #[test]
    fn test_accepts_formula() {
        let table = TableId::new();
        assert!(Column::new(table, "Width", DataType::Number).accepts_formula());
        assert!(!Column::new(table, "Notes", DataType::Text).accepts_formula());
    }

    #[test]
    fn test_has_formula() {
        let mut col = Column::new(TableId::new(), "Area", DataType::Number);
        assert!(!col.has_formula());
        col.formula_text = Some("   ".into());
        assert!(!col.has_formula());
        col.formula_text = Some("Width * 2".into());
        assert!(col.has_formula());
        assert_eq!(col.to_string(), "Area (number)");
    }
}
