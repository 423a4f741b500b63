//! Cell value validation
//!
//! Values are stored as strings regardless of column type. These checks run on
//! the data entry path before a value is persisted:
//!
//! - `number` must parse as a float
//! - `email` must look like `local@domain.tld`
//! - `date` must be an ISO `YYYY-MM-DD` date
//! - `checkbox` accepts `true`/`false`/`1`/`0` in any case
//! - `select` must be one of the column's options
//!
//! Blank values always pass here; whether a blank is allowed is decided by
//! [`check_required`].

use chrono::NaiveDate;
use lazy_regex::regex_is_match;

use crate::column::{Column, DataType, SelectOption};
use crate::error::{Error, Result};

/// Validate a raw value against a column's data type
pub fn validate_value(column: &Column, options: &[SelectOption], value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }

    let valid = match column.data_type {
        DataType::Number => value.trim().parse::<f64>().is_ok(),
        DataType::Email => regex_is_match!(r"^[^@\s]+@[^@\s]+\.[^@\s]+$", value),
        DataType::Date => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").is_ok(),
        DataType::Checkbox => parse_checkbox(value).is_some(),
        DataType::Select => {
            if options.iter().any(|option| option.value == value) {
                true
            } else {
                return Err(Error::InvalidOption {
                    column: column.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        DataType::Text | DataType::Textarea | DataType::File | DataType::Image => true,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidValue {
            data_type: column.data_type,
            value: value.to_string(),
        })
    }
}

/// Reject a blank value on a required cell
///
/// File and image cells may be left blank; their content lives elsewhere.
pub fn check_required(column: &Column, is_required: bool, value: &str) -> Result<()> {
    if matches!(column.data_type, DataType::File | DataType::Image) {
        return Ok(());
    }
    if is_required && value.trim().is_empty() {
        return Err(Error::ValueRequired(column.data_type));
    }
    Ok(())
}

/// Parse a checkbox value
pub fn parse_checkbox(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TableId;

    fn column(data_type: DataType) -> Column {
        Column::new(TableId::new(), "Field", data_type)
    }

    #[test]
    fn test_number_validation() {
        let col = column(DataType::Number);
        assert!(validate_value(&col, &[], "3").is_ok());
        assert!(validate_value(&col, &[], " 2.5 ").is_ok());
        assert!(validate_value(&col, &[], "").is_ok());
        assert!(matches!(
            validate_value(&col, &[], "three"),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_email_validation() {
        let col = column(DataType::Email);
        assert!(validate_value(&col, &[], "ops@example.com").is_ok());
        assert!(validate_value(&col, &[], "ops@example").is_err());
        assert!(validate_value(&col, &[], "not an email").is_err());
    }

    #[test]
    fn test_date_validation() {
        let col = column(DataType::Date);
        assert!(validate_value(&col, &[], "2024-02-29").is_ok());
        assert!(validate_value(&col, &[], "2023-02-29").is_err());
        assert!(validate_value(&col, &[], "29/02/2024").is_err());
    }

    #[test]
    fn test_checkbox_validation() {
        let col = column(DataType::Checkbox);
        assert!(validate_value(&col, &[], "TRUE").is_ok());
        assert!(validate_value(&col, &[], "0").is_ok());
        assert!(validate_value(&col, &[], "maybe").is_err());
        assert_eq!(parse_checkbox("False"), Some(false));
    }

    #[test]
    fn test_select_validation() {
        let col = column(DataType::Select);
        let options = vec![
            SelectOption::new(col.id, "Open"),
            SelectOption::new(col.id, "Closed"),
        ];
        assert!(validate_value(&col, &options, "Open").is_ok());
        let err = validate_value(&col, &options, "Pending").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Value 'Pending' is not a valid option for column 'Field'"
        );
    }

    #[test]
    fn test_check_required() {
        let col = column(DataType::Text);
        assert!(check_required(&col, true, "x").is_ok());
        assert!(check_required(&col, false, "").is_ok());
        assert!(matches!(
            check_required(&col, true, "  "),
            Err(Error::ValueRequired(DataType::Text))
        ));
    }

    #[test]
    fn test_file_and_image_may_be_blank() {
        for data_type in [DataType::File, DataType::Image] {
            assert!(check_required(&column(data_type), true, "").is_ok());
        }
        assert!(check_required(&column(DataType::Number), true, "").is_err());
    }
}
