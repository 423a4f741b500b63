//! Persisted formula records
//!
//! A formula column is stored as an ordered list of [`FormulaStep`]s. Each step
//! carries an optional [`OperationKind`] and an optional [`FormulaOperand`].
//! The six operations form a fixed [`OperationCatalog`].

use std::fmt;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use crate::id::{ColumnId, StepId};

/// How many values an operation consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Applied to the running result alone
    Unary,
    /// Combines the running result with the next operand
    Binary,
}

/// The fixed set of formula operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OperationKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Sqrt,
    Percent,
}

impl OperationKind {
    /// Catalog name
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Subtract => "subtract",
            OperationKind::Multiply => "multiply",
            OperationKind::Divide => "divide",
            OperationKind::Sqrt => "sqrt",
            OperationKind::Percent => "percent",
        }
    }

    /// Symbol as written in formula text
    pub fn symbol(&self) -> &'static str {
        match self {
            OperationKind::Add => "+",
            OperationKind::Subtract => "-",
            OperationKind::Multiply => "*",
            OperationKind::Divide => "/",
            OperationKind::Sqrt => "sqrt",
            OperationKind::Percent => "%",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            OperationKind::Sqrt | OperationKind::Percent => Arity::Unary,
            _ => Arity::Binary,
        }
    }

    pub fn is_unary(&self) -> bool {
        self.arity() == Arity::Unary
    }

    /// Look up an operation by its formula symbol (`sqrt` is case-insensitive)
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(OperationKind::Add),
            "-" => Some(OperationKind::Subtract),
            "*" => Some(OperationKind::Multiply),
            "/" => Some(OperationKind::Divide),
            "%" => Some(OperationKind::Percent),
            s if s.eq_ignore_ascii_case("sqrt") => Some(OperationKind::Sqrt),
            _ => None,
        }
    }

    /// Apply a unary operation to `value`
    ///
    /// Binary operations leave the value untouched.
    pub fn apply_unary(&self, value: f64) -> f64 {
        match self {
            // f64::sqrt already yields NaN below zero
            OperationKind::Sqrt => value.sqrt(),
            OperationKind::Percent => value * 0.01,
            _ => value,
        }
    }

    /// Apply a binary operation to `(left, right)`
    ///
    /// Division by zero yields NaN rather than an infinity.
    pub fn apply_binary(&self, left: f64, right: f64) -> f64 {
        match self {
            OperationKind::Add => left + right,
            OperationKind::Subtract => left - right,
            OperationKind::Multiply => left * right,
            OperationKind::Divide => {
                if right == 0.0 {
                    f64::NAN
                } else {
                    left / right
                }
            }
            OperationKind::Sqrt | OperationKind::Percent => self.apply_unary(left),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A catalog entry: read-only reference data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub name: &'static str,
    pub symbol: &'static str,
    pub arity: Arity,
}

/// Read-only enumeration of the six supported operations
#[derive(Debug)]
pub struct OperationCatalog {
    operations: Vec<Operation>,
}

static CATALOG: Lazy<OperationCatalog> = Lazy::new(OperationCatalog::seed);

impl OperationCatalog {
    fn seed() -> Self {
        let operations = [
            OperationKind::Add,
            OperationKind::Subtract,
            OperationKind::Multiply,
            OperationKind::Divide,
            OperationKind::Sqrt,
            OperationKind::Percent,
        ]
        .into_iter()
        .map(|kind| Operation {
            kind,
            name: kind.name(),
            symbol: kind.symbol(),
            arity: kind.arity(),
        })
        .collect();
        Self { operations }
    }

    /// The process-wide catalog
    pub fn global() -> &'static OperationCatalog {
        &CATALOG
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Operation> {
        let kind = OperationKind::from_symbol(symbol)?;
        self.get(kind)
    }

    pub fn by_name(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn get(&self, kind: OperationKind) -> Option<&Operation> {
        self.operations.iter().find(|op| op.kind == kind)
    }
}

/// Right-hand value of a step: a column reference or a constant, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FormulaOperand {
    Column(ColumnId),
    Constant(Decimal),
}

impl FormulaOperand {
    /// Referenced column, if any
    pub fn column(&self) -> Option<ColumnId> {
        match self {
            FormulaOperand::Column(id) => Some(*id),
            FormulaOperand::Constant(_) => None,
        }
    }

    pub fn constant(&self) -> Option<Decimal> {
        match self {
            FormulaOperand::Constant(value) => Some(*value),
            FormulaOperand::Column(_) => None,
        }
    }

    pub fn references(&self, column: ColumnId) -> bool {
        self.column() == Some(column)
    }
}

/// One compiled step of a column's formula
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormulaStep {
    pub id: StepId,
    /// The formula owner
    pub column: ColumnId,
    /// Ascending evaluation order, dense from 0
    pub order: u32,
    pub operation: Option<OperationKind>,
    pub operand: Option<FormulaOperand>,
}

impl FormulaStep {
    pub fn new(
        column: ColumnId,
        order: u32,
        operation: Option<OperationKind>,
        operand: Option<FormulaOperand>,
    ) -> Self {
        Self {
            id: StepId::new(),
            column,
            order,
            operation,
            operand,
        }
    }

    /// Column referenced by this step's operand, if any
    pub fn referenced_column(&self) -> Option<ColumnId> {
        self.operand.and_then(|operand| operand.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_six_entries() {
        let catalog = OperationCatalog::global();
        assert_eq!(catalog.len(), 6);
        let symbols: Vec<_> = catalog.iter().map(|op| op.symbol).collect();
        assert_eq!(symbols, vec!["+", "-", "*", "/", "sqrt", "%"]);
        assert_eq!(catalog.by_name("percent").unwrap().symbol, "%");
        assert_eq!(catalog.by_symbol("SQRT").unwrap().kind, OperationKind::Sqrt);
        assert!(catalog.by_symbol("^").is_none());
    }

    #[test]
    fn test_division_by_zero_is_nan() {
        assert!(OperationKind::Divide.apply_binary(5.0, 0.0).is_nan());
        assert!(OperationKind::Divide.apply_binary(0.0, 0.0).is_nan());
        assert_eq!(OperationKind::Divide.apply_binary(6.0, 3.0), 2.0);
    }

    #[test]
    fn test_unary_operations() {
        assert_eq!(OperationKind::Sqrt.apply_unary(9.0), 3.0);
        assert!(OperationKind::Sqrt.apply_unary(-4.0).is_nan());
        assert_eq!(OperationKind::Percent.apply_unary(50.0), 0.5);
        assert!(OperationKind::Percent.is_unary());
        assert!(!OperationKind::Subtract.is_unary());
    }

    #[test]
    fn test_operand_references() {
        let col = ColumnId::new();
        let operand = FormulaOperand::Column(col);
        assert!(operand.references(col));
        assert!(!FormulaOperand::Constant(Decimal::ONE).references(col));

        let step = FormulaStep::new(ColumnId::new(), 0, Some(OperationKind::Add), Some(operand));
        assert_eq!(step.referenced_column(), Some(col));
    }
}
