//! Formula compiler
//!
//! Formulas are a flat left-to-right chain with no precedence and no grouping:
//! `A + B * 2` means `(A + B) * 2`, and parentheses are accepted but ignored.
//!
//! Compilation produces one [`FormulaStep`] per operator, carrying the operand
//! written to its left. The last operand becomes a terminal step without an
//! operation, so `Width * 2` compiles to `[(*, Width), (none, 2)]`. A binary
//! operator written right after a unary one (`A % + 2`) gets a step with no
//! operand, which the evaluator reads as "the running result".

use rust_decimal::Decimal;
use tabula_core::{Column, ColumnId, DataType, FormulaOperand, FormulaStep, OperationKind, Store};

use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{tokenize_spanned, Token};
use crate::validate::ValidationIssue;

/// Operand as written, before column names are resolved
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlannedOperand {
    Column { name: String, offset: usize },
    Constant(Decimal),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedStep {
    pub operation: Option<OperationKind>,
    pub operand: Option<PlannedOperand>,
}

/// Result of the syntactic pass over a formula
#[derive(Debug, Default)]
pub(crate) struct Analysis {
    pub steps: Vec<PlannedStep>,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Start,
    Operand,
    Binary,
    Unary,
}

/// Walk the token stream and lay out steps without touching the store
pub(crate) fn analyze(text: &str) -> Analysis {
    let mut analysis = Analysis::default();
    let mut pending: Option<PlannedOperand> = None;
    let mut last = Last::Start;
    let mut last_operator: Option<(OperationKind, usize)> = None;

    for spanned in tokenize_spanned(text) {
        let offset = spanned.offset;
        match spanned.token {
            Token::LeftParen | Token::RightParen => continue,
            Token::Malformed(lexeme) => {
                analysis.issues.push(ValidationIssue::MalformedNumber {
                    text: lexeme,
                    offset,
                });
                pending = None;
                last = Last::Operand;
            }
            Token::OutOfRange(lexeme) => {
                analysis.issues.push(ValidationIssue::NumberOutOfRange {
                    text: lexeme,
                    offset,
                });
                pending = None;
                last = Last::Operand;
            }
            Token::Number(value) => {
                check_operand_position(last, offset, &mut analysis.issues);
                pending = Some(PlannedOperand::Constant(value));
                last = Last::Operand;
            }
            Token::Identifier(name) => {
                check_operand_position(last, offset, &mut analysis.issues);
                pending = Some(PlannedOperand::Column { name, offset });
                last = Last::Operand;
            }
            Token::Operator(kind) => {
                match pending.take() {
                    Some(operand) => analysis.steps.push(PlannedStep {
                        operation: Some(kind),
                        operand: Some(operand),
                    }),
                    None if last == Last::Unary => analysis.steps.push(PlannedStep {
                        operation: Some(kind),
                        operand: None,
                    }),
                    None if last == Last::Operand => {
                        // Operand was malformed and already reported
                    }
                    None => analysis.issues.push(ValidationIssue::DanglingOperator {
                        symbol: kind.symbol(),
                        offset,
                    }),
                }
                last = if kind.is_unary() { Last::Unary } else { Last::Binary };
                last_operator = Some((kind, offset));
            }
        }
    }

    match pending {
        Some(operand) => analysis.steps.push(PlannedStep {
            operation: None,
            operand: Some(operand),
        }),
        None => match (last, last_operator) {
            (Last::Start, _) => analysis.issues.push(ValidationIssue::EmptyFormula),
            (Last::Binary, Some((kind, offset))) => {
                analysis.issues.push(ValidationIssue::TrailingOperator {
                    symbol: kind.symbol(),
                    offset,
                })
            }
            _ => {}
        },
    }

    analysis
}

/// Operands may only open the formula or follow a binary operator
fn check_operand_position(last: Last, offset: usize, issues: &mut Vec<ValidationIssue>) {
    if matches!(last, Last::Operand | Last::Unary) {
        issues.push(ValidationIssue::MissingOperator { offset });
    }
}

/// Output of a compilation
#[derive(Debug, Clone, Default)]
pub struct CompiledFormula {
    /// Steps in evaluation order, `order` dense from 0
    pub steps: Vec<FormulaStep>,
    /// Columns that did not exist and were created as number columns
    pub created_columns: Vec<Column>,
}

impl CompiledFormula {
    /// Number of steps carrying an operation
    pub fn operator_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.operation.is_some())
            .count()
    }

    /// Distinct columns referenced by the steps, in first-use order
    pub fn referenced_columns(&self) -> Vec<ColumnId> {
        let mut columns = Vec::new();
        for column in self.steps.iter().filter_map(|step| step.referenced_column()) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }
}

/// Turns formula text into persisted steps
pub trait FormulaCompiler {
    /// Compile `text` as the formula of `owner`
    ///
    /// Unknown column names are created in the owner's table as number
    /// columns. Nothing is written to the store when the text does not compile.
    fn compile(&self, text: &str, owner: &Column, store: &Store) -> FormulaResult<CompiledFormula>;
}

/// The left-to-right chain compiler
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainCompiler;

impl FormulaCompiler for ChainCompiler {
    fn compile(&self, text: &str, owner: &Column, store: &Store) -> FormulaResult<CompiledFormula> {
        if owner.data_type != DataType::Number {
            return Err(FormulaError::NotAFormulaColumn(owner.name.clone()));
        }

        let analysis = analyze(text);
        if let Some(issue) = analysis
            .issues
            .iter()
            .find(|issue| issue.blocks_compilation())
        {
            return Err(FormulaError::Parse(issue.to_string()));
        }

        let mut compiled = CompiledFormula::default();
        for (order, planned) in analysis.steps.into_iter().enumerate() {
            let operand = match planned.operand {
                Some(PlannedOperand::Column { name, .. }) => {
                    let (column, created) =
                        store.get_or_create_column(owner.table, &name, DataType::Number)?;
                    if created {
                        compiled.created_columns.push(column.clone());
                    }
                    Some(FormulaOperand::Column(column.id))
                }
                Some(PlannedOperand::Constant(value)) => Some(FormulaOperand::Constant(value)),
                None => None,
            };
            compiled.steps.push(FormulaStep::new(
                owner.id,
                order as u32,
                planned.operation,
                operand,
            ));
        }

        Ok(compiled)
    }
}

/// Compile with the default [`ChainCompiler`]
pub fn compile(text: &str, owner: &Column, store: &Store) -> FormulaResult<CompiledFormula> {
    ChainCompiler.compile(text, owner, store)
}

/// Rebuild the persisted steps of a column from its formula text
///
/// Old steps are replaced in one write and the column's generation is bumped,
/// which invalidates cached values computed from the old formula. A column
/// without formula text ends up with no steps.
pub fn recompile(column: &Column, store: &Store) -> FormulaResult<CompiledFormula> {
    recompile_with(&ChainCompiler, column, store)
}

/// [`recompile`] with a specific compiler
pub fn recompile_with<C: FormulaCompiler + ?Sized>(
    compiler: &C,
    column: &Column,
    store: &Store,
) -> FormulaResult<CompiledFormula> {
    let compiled = match column.formula_text.as_deref() {
        Some(text) if !text.trim().is_empty() => compiler.compile(text, column, store)?,
        _ => CompiledFormula::default(),
    };
    store.replace_steps(column.id, compiled.steps.clone())?;
    store.bump_generation(column.id)?;
    Ok(compiled)
}
