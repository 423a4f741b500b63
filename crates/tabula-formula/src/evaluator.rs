//! Formula evaluator
//!
//! Evaluates a column's compiled steps for one table api (row). Evaluation is
//! split in three phases so the arithmetic itself never writes to the store:
//!
//! 1. [`Evaluator::plan`] lists referenced cells that do not exist yet
//! 2. [`Evaluator::materialize`] creates them, empty and not required
//! 3. [`Evaluator::evaluate`] walks the steps and produces a number
//!
//! [`Evaluator::computed_value`] runs all three and renders the result (or the
//! failure) as the string shown to users.

use ahash::{AHashMap, AHashSet};
use rust_decimal::prelude::ToPrimitive;
use tabula_core::{Cell, Column, ColumnId, DataType, FormulaOperand, FormulaStep, Store, TableApiId};

use crate::cache::ValueCache;
use crate::error::{FormulaError, FormulaResult};

/// Prefix of the value shown for a formula that failed to evaluate
pub const ERROR_PREFIX: &str = "Error in formula: ";

/// A referenced cell that evaluation needs but the store does not have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MissingCell {
    pub table_api: TableApiId,
    pub column: ColumnId,
}

/// Per-evaluation bookkeeping
///
/// Each formula column is evaluated at most once per walk; later references
/// reuse the stored result.
#[derive(Debug, Default)]
struct Walk {
    visiting: Vec<ColumnId>,
    done: AHashMap<ColumnId, f64>,
}

/// Context for formula evaluation
pub struct Evaluator<'a> {
    store: &'a Store,
    cache: Option<&'a ValueCache>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator without a cache
    pub fn new(store: &'a Store) -> Self {
        Self { store, cache: None }
    }

    /// Serve and record results through `cache`
    pub fn with_cache(mut self, cache: &'a ValueCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The value users see for a cell
    ///
    /// Cells of plain columns return their stored value. Cells of number
    /// columns with a formula return the formatted result, or the error text
    /// prefixed with `Error in formula: `. Failures are never cached.
    pub fn computed_value(&self, cell: &Cell) -> String {
        let column = match self.store.column(cell.column) {
            Ok(column) => column,
            Err(e) => return format!("{}{}", ERROR_PREFIX, e),
        };
        if column.data_type != DataType::Number || !self.store.has_steps(column.id) {
            return cell.value.clone();
        }

        if let Some(hit) = self
            .cache
            .and_then(|cache| cache.get(cell.id, column.generation))
        {
            return hit;
        }

        match self.compute(cell) {
            Ok(value) => {
                let text = format_number(value);
                if let Some(cache) = self.cache {
                    cache.insert(cell.id, column.generation, text.clone());
                }
                text
            }
            Err(e) => {
                tracing::debug!(cell = %cell.id, column = %column.name, error = %e, "formula failed");
                format!("{}{}", ERROR_PREFIX, e)
            }
        }
    }

    /// Plan, materialize and evaluate
    pub fn compute(&self, cell: &Cell) -> FormulaResult<f64> {
        let missing = self.plan(cell);
        self.materialize(&missing)?;
        self.evaluate(cell)
    }

    /// Referenced cells in the cell's table api that do not exist yet
    ///
    /// Follows references through other formula columns, so every cell the
    /// evaluation will read is covered.
    pub fn plan(&self, cell: &Cell) -> Vec<MissingCell> {
        let mut seen = AHashSet::new();
        seen.insert(cell.column);
        let mut missing = Vec::new();
        self.collect_missing(cell.table_api, cell.column, &mut seen, &mut missing);
        missing
    }

    fn collect_missing(
        &self,
        table_api: TableApiId,
        column: ColumnId,
        seen: &mut AHashSet<ColumnId>,
        missing: &mut Vec<MissingCell>,
    ) {
        for referenced in self
            .store
            .steps(column)
            .iter()
            .filter_map(FormulaStep::referenced_column)
        {
            if !seen.insert(referenced) {
                continue;
            }
            if self.store.find_cell(table_api, referenced).is_none() {
                missing.push(MissingCell {
                    table_api,
                    column: referenced,
                });
            }
            self.collect_missing(table_api, referenced, seen, missing);
        }
    }

    /// Create the planned cells, returning those actually created
    ///
    /// A cell created concurrently by someone else is reused, not duplicated.
    pub fn materialize(&self, missing: &[MissingCell]) -> FormulaResult<Vec<Cell>> {
        let mut created = Vec::new();
        for slot in missing {
            let (cell, was_created) = self.store.get_or_create_cell(slot.table_api, slot.column)?;
            if was_created {
                tracing::debug!(cell = %cell.id, column = %slot.column, "created empty cell for formula operand");
                created.push(cell);
            }
        }
        Ok(created)
    }

    /// Evaluate a cell's formula without touching the store or the cache
    ///
    /// Referenced cells that do not exist read as 0.
    pub fn evaluate(&self, cell: &Cell) -> FormulaResult<f64> {
        let mut walk = Walk::default();
        self.evaluate_column(cell.table_api, cell.column, &mut walk)
    }

    fn evaluate_column(
        &self,
        table_api: TableApiId,
        column: ColumnId,
        walk: &mut Walk,
    ) -> FormulaResult<f64> {
        if let Some(&value) = walk.done.get(&column) {
            return Ok(value);
        }
        let owner = self.store.column(column)?;
        if walk.visiting.contains(&column) {
            return Err(FormulaError::CircularReference(owner.name));
        }

        let steps = self.store.steps(column);
        if steps.is_empty() {
            return Err(FormulaError::evaluation(format!(
                "column '{}' has no formula",
                owner.name
            )));
        }

        walk.visiting.push(column);
        let result = self.run_steps(table_api, &steps, walk);
        walk.visiting.pop();
        if let Ok(value) = &result {
            walk.done.insert(column, *value);
        }
        result
    }

    /// Walk the steps left to right
    ///
    /// The first resolved operand seeds the running result. A binary step
    /// combines the result with the operand of the following step; a unary
    /// step transforms the result in place.
    fn run_steps(
        &self,
        table_api: TableApiId,
        steps: &[FormulaStep],
        walk: &mut Walk,
    ) -> FormulaResult<f64> {
        let mut result: Option<f64> = None;

        for (i, step) in steps.iter().enumerate() {
            let current = match result {
                Some(value) => value,
                None => self.resolve_operand(table_api, step, None, walk)?,
            };

            let Some(operation) = step.operation else {
                result = Some(current);
                continue;
            };

            result = Some(if operation.is_unary() {
                operation.apply_unary(current)
            } else {
                let next = steps.get(i + 1).ok_or_else(|| {
                    FormulaError::evaluation(format!(
                        "missing second operand for '{}' at step {}",
                        operation.name(),
                        step.order
                    ))
                })?;
                let right = self.resolve_operand(table_api, next, Some(current), walk)?;
                operation.apply_binary(current, right)
            });
        }

        result.ok_or_else(|| FormulaError::evaluation("formula has no steps"))
    }

    fn resolve_operand(
        &self,
        table_api: TableApiId,
        step: &FormulaStep,
        current: Option<f64>,
        walk: &mut Walk,
    ) -> FormulaResult<f64> {
        match step.operand {
            Some(FormulaOperand::Constant(value)) => value.to_f64().ok_or_else(|| {
                FormulaError::evaluation(format!("constant {} is out of range", value))
            }),
            Some(FormulaOperand::Column(column)) => {
                self.sibling_value(table_api, column, walk)
            }
            None => current.ok_or_else(|| {
                FormulaError::evaluation(format!("step {} has no operand", step.order))
            }),
        }
    }

    /// Numeric value of another column in the same table api
    fn sibling_value(
        &self,
        table_api: TableApiId,
        column: ColumnId,
        walk: &mut Walk,
    ) -> FormulaResult<f64> {
        let sibling = self.store.column(column)?;
        if sibling.data_type == DataType::Number && self.store.has_steps(column) {
            return self.evaluate_column(table_api, column, walk);
        }

        let raw = self
            .store
            .find_cell(table_api, column)
            .map(|cell| cell.value)
            .unwrap_or_default();
        parse_operand_value(&raw, &sibling)
    }
}

/// Convert a stored value to a number; blank reads as 0
fn parse_operand_value(raw: &str, column: &Column) -> FormulaResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed.parse::<f64>().map_err(|_| {
        FormulaError::evaluation(format!(
            "could not convert '{}' in column '{}' to a number",
            raw, column.name
        ))
    })
}

/// Render a result the way the rest of the platform expects
///
/// Whole numbers keep a trailing `.0`, magnitudes from `1e16` up or below
/// `1e-4` switch to exponent form, and non-finite values read `nan`, `inf` or
/// `-inf`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{:e}", value);
        let (mantissa, exponent) = formatted
            .split_once('e')
            .unwrap_or((formatted.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}
