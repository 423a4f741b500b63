//! Formula validation
//!
//! A read-only check of formula text against a table schema. Used by the
//! schema editor before a formula is accepted; it never creates columns.

use std::fmt;

use tabula_core::{Column, ColumnId, Store};

use crate::compiler::{analyze, PlannedOperand};
use crate::dependency::ColumnGraph;

/// A problem found in formula text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Nothing but whitespace, parentheses or skipped characters
    EmptyFormula,
    /// Digits and dots that do not form a number, e.g. `1.2.3`
    MalformedNumber { text: String, offset: usize },
    /// A well-formed number too large for a constant
    NumberOutOfRange { text: String, offset: usize },
    /// An operator with nothing to its left
    DanglingOperator { symbol: &'static str, offset: usize },
    /// Two operands with no operator between them
    MissingOperator { offset: usize },
    /// A binary operator at the very end
    TrailingOperator { symbol: &'static str, offset: usize },
    /// A name that is not a column of the table
    UnknownColumn { name: String, offset: usize },
    /// The formula reads its own column
    SelfReference { name: String },
    /// The formula reads a column whose value depends on this one
    CircularReference { name: String },
}

impl ValidationIssue {
    /// Whether the compiler refuses text with this issue
    ///
    /// Unknown columns are created on compile and the remaining issues only
    /// surface when the formula is evaluated.
    pub fn blocks_compilation(&self) -> bool {
        matches!(
            self,
            ValidationIssue::EmptyFormula
                | ValidationIssue::MalformedNumber { .. }
                | ValidationIssue::NumberOutOfRange { .. }
                | ValidationIssue::DanglingOperator { .. }
                | ValidationIssue::MissingOperator { .. }
        )
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyFormula => f.write_str("formula is empty"),
            ValidationIssue::MalformedNumber { text, offset } => {
                write!(f, "malformed number '{}' at position {}", text, offset)
            }
            ValidationIssue::NumberOutOfRange { text, offset } => {
                write!(f, "number '{}' at position {} is out of range", text, offset)
            }
            ValidationIssue::DanglingOperator { symbol, offset } => {
                write!(f, "operator '{}' at position {} has no left operand", symbol, offset)
            }
            ValidationIssue::MissingOperator { offset } => {
                write!(f, "expected an operator before position {}", offset)
            }
            ValidationIssue::TrailingOperator { symbol, offset } => write!(
                f,
                "operator '{}' at position {} has no right operand",
                symbol, offset
            ),
            ValidationIssue::UnknownColumn { name, .. } => {
                write!(f, "Column '{}' does not exist in the table", name)
            }
            ValidationIssue::SelfReference { name } => {
                write!(f, "formula of column '{}' refers to itself", name)
            }
            ValidationIssue::CircularReference { name } => write!(
                f,
                "formula of column '{}' depends on itself through other columns",
                name
            ),
        }
    }
}

/// Check `text` as a formula for `owner`
///
/// `owner` does not need to be in the store yet, which lets a new column's
/// formula be checked before the column is saved. Returns every issue found,
/// empty when the formula is acceptable.
pub fn validate(text: &str, owner: &Column, store: &Store) -> Vec<ValidationIssue> {
    let analysis = analyze(text);
    let mut issues = analysis.issues;
    let mut self_reference = false;
    let mut referenced: Vec<ColumnId> = Vec::new();

    for planned in &analysis.steps {
        if let Some(PlannedOperand::Column { name, offset }) = &planned.operand {
            if *name == owner.name {
                self_reference = true;
            } else {
                match store.column_by_name(owner.table, name) {
                    Some(column) => referenced.push(column.id),
                    None => issues.push(ValidationIssue::UnknownColumn {
                        name: name.clone(),
                        offset: *offset,
                    }),
                }
            }
        }
    }

    if self_reference {
        issues.push(ValidationIssue::SelfReference {
            name: owner.name.clone(),
        });
    }
    if creates_cycle(owner.id, &referenced, store) {
        issues.push(ValidationIssue::CircularReference {
            name: owner.name.clone(),
        });
    }
    issues
}

/// Whether reading `referenced` from `owner` closes a loop through other formulas
fn creates_cycle(owner: ColumnId, referenced: &[ColumnId], store: &Store) -> bool {
    if referenced.is_empty() {
        return false;
    }
    let others: Vec<_> = store
        .all_steps()
        .into_iter()
        .filter(|step| step.column != owner)
        .collect();
    let mut graph = ColumnGraph::from_steps(&others);
    for &column in referenced {
        graph.add_dependency(column, owner);
    }
    graph.has_circular_reference(owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::DataType;

    fn setup() -> (Store, Column) {
        let store = Store::new();
        let table = store.create_table("Rooms");
        store.add_column(table.id, "Width", DataType::Number).unwrap();
        store.add_column(table.id, "Height", DataType::Number).unwrap();
        let owner = Column::new(table.id, "Area", DataType::Number);
        (store, owner)
    }

    #[test]
    fn test_valid_formula() {
        let (store, owner) = setup();
        assert!(validate("Width * Height", &owner, &store).is_empty());
        assert!(validate("(Width + 2) * 0.5", &owner, &store).is_empty());
        assert!(validate("Width sqrt", &owner, &store).is_empty());
    }

    #[test]
    fn test_unknown_column() {
        let (store, owner) = setup();
        let issues = validate("Width * Depth", &owner, &store);
        assert_eq!(
            issues,
            vec![ValidationIssue::UnknownColumn {
                name: "Depth".into(),
                offset: 8
            }]
        );
        assert_eq!(
            issues[0].to_string(),
            "Column 'Depth' does not exist in the table"
        );
        // Validation never creates columns
        assert!(store.column_by_name(owner.table, "Depth").is_none());
    }

    #[test]
    fn test_syntax_issues() {
        let (store, owner) = setup();
        assert_eq!(
            validate("", &owner, &store),
            vec![ValidationIssue::EmptyFormula]
        );
        assert_eq!(
            validate("+ Width", &owner, &store),
            vec![ValidationIssue::DanglingOperator {
                symbol: "+",
                offset: 0
            }]
        );
        assert_eq!(
            validate("Width *", &owner, &store),
            vec![ValidationIssue::TrailingOperator {
                symbol: "*",
                offset: 6
            }]
        );
        assert_eq!(
            validate("Width Height", &owner, &store),
            vec![ValidationIssue::MissingOperator { offset: 6 }]
        );
        assert!(matches!(
            validate("Width + 1..2", &owner, &store)[0],
            ValidationIssue::MalformedNumber { .. }
        ));
        let issues = validate("100000000000000000000000000000 * 2", &owner, &store);
        assert_eq!(
            issues[0].to_string(),
            "number '100000000000000000000000000000' at position 0 is out of range"
        );
        assert!(issues[0].blocks_compilation());
    }

    #[test]
    fn test_self_reference() {
        let (store, owner) = setup();
        assert_eq!(
            validate("Area + 1", &owner, &store),
            vec![ValidationIssue::SelfReference {
                name: "Area".into()
            }]
        );
    }

    #[test]
    fn test_indirect_cycle() {
        let (store, owner) = setup();
        let table = owner.table;
        let x = store.add_column(table, "X", DataType::Number).unwrap();
        let y = store.add_column(table, "Y", DataType::Number).unwrap();
        let compiled = crate::compiler::compile("X + 1", &y, &store).unwrap();
        store.replace_steps(y.id, compiled.steps).unwrap();

        assert_eq!(
            validate("Y + 1", &x, &store),
            vec![ValidationIssue::CircularReference { name: "X".into() }]
        );
        assert!(validate("Width + 1", &x, &store).is_empty());
        // Replacing the formula that closed the loop clears it
        assert!(validate("X * 2", &y, &store).is_empty());
    }

    #[test]
    fn test_blocking_issues() {
        assert!(ValidationIssue::EmptyFormula.blocks_compilation());
        assert!(!ValidationIssue::TrailingOperator {
            symbol: "+",
            offset: 0
        }
        .blocks_compilation());
        assert!(!ValidationIssue::UnknownColumn {
            name: "X".into(),
            offset: 0
        }
        .blocks_compilation());
    }
}
