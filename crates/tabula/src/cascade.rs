//! Dependency cascade
//!
//! When a cell is saved, formula columns that read its column are recomputed
//! for the same table api and their values persisted. A [`CascadeJob`] is
//! produced for every direct save; the [`CascadeRunner`] executes it.
//!
//! Writes made by the runner go straight to the store and never produce new
//! jobs. Callers that write cells from inside a job carry a
//! [`CascadeContext`], which the engine honours the same way.

use std::fmt;

use tabula_core::{Cell, CellId, ColumnId, Store, TableApiId};
use tabula_formula::{ColumnGraph, Evaluator, ValueCache, ERROR_PREFIX};
use uuid::Uuid;

use crate::error::Result;
use crate::options::CascadePolicy;

/// A unit of cascade work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeJob {
    pub job_id: Uuid,
    /// The cell whose save triggered the job
    pub cell: CellId,
}

impl CascadeJob {
    pub fn new(cell: CellId) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            cell,
        }
    }
}

impl fmt::Display for CascadeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cascade {} for cell {}", self.job_id, self.cell)
    }
}

/// Marker that a write happens inside a running cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeContext {
    job_id: Uuid,
}

impl CascadeContext {
    pub fn new(job: &CascadeJob) -> Self {
        Self { job_id: job.job_id }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }
}

/// Statistics from a cascade run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeStats {
    /// Cells whose value was recomputed and persisted
    pub cells_updated: usize,
    /// Dependent cells that did not exist and were created
    pub cells_created: usize,
    /// Persisted values that are formula error strings
    pub formula_errors: usize,
    /// Cells skipped because they could not be loaded or written
    pub failures: usize,
}

impl CascadeStats {
    fn merge(&mut self, other: &CascadeStats) {
        self.cells_updated += other.cells_updated;
        self.cells_created += other.cells_created;
        self.formula_errors += other.formula_errors;
        self.failures += other.failures;
    }
}

/// Executes cascade jobs against a store
#[derive(Debug, Clone)]
pub struct CascadeRunner {
    store: Store,
    cache: ValueCache,
    policy: CascadePolicy,
}

impl CascadeRunner {
    pub fn new(store: Store, cache: ValueCache, policy: CascadePolicy) -> Self {
        Self {
            store,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> CascadePolicy {
        self.policy
    }

    /// Run one job
    ///
    /// Fails only when the origin cell is gone. Failures on individual
    /// dependent cells are logged and counted, and do not undo earlier writes.
    pub fn run(&self, job: &CascadeJob) -> Result<CascadeStats> {
        let span = tracing::debug_span!("cascade", job_id = %job.job_id, cell = %job.cell);
        let _enter = span.enter();

        let origin = self.store.cell(job.cell)?;
        let evaluator = Evaluator::new(&self.store).with_cache(&self.cache);
        let mut stats = CascadeStats::default();

        if self.store.has_steps(origin.column) {
            self.recompute(&evaluator, origin.table_api, origin.column, &mut stats);
        }

        let columns = self.affected_columns(origin.column);
        tracing::debug!(dependents = columns.len(), policy = %self.policy, "recomputing dependents");
        for column in columns {
            self.recompute(&evaluator, origin.table_api, column, &mut stats);
        }

        tracing::debug!(
            updated = stats.cells_updated,
            created = stats.cells_created,
            failures = stats.failures,
            "cascade finished"
        );
        Ok(stats)
    }

    /// Formula columns to recompute after `column` changed
    fn affected_columns(&self, column: ColumnId) -> Vec<ColumnId> {
        match self.policy {
            CascadePolicy::OneHop => {
                let mut columns = Vec::new();
                for step in self.store.steps_referencing(column) {
                    if step.column != column && !columns.contains(&step.column) {
                        columns.push(step.column);
                    }
                }
                columns
            }
            CascadePolicy::Transitive => {
                ColumnGraph::from_store(&self.store).recalc_order(&[column])
            }
        }
    }

    /// Recompute a formula column, and everything downstream of it, for every
    /// table api of its table
    ///
    /// Used after a formula changes, when every persisted value of the column
    /// is stale.
    pub fn refresh_column(&self, column: ColumnId) -> Result<CascadeStats> {
        let owner = self.store.column(column)?;
        let mut columns = vec![column];
        columns.extend(ColumnGraph::from_store(&self.store).recalc_order(&[column]));

        let evaluator = Evaluator::new(&self.store).with_cache(&self.cache);
        let mut stats = CascadeStats::default();
        for table_api in self.store.table_apis(owner.table)? {
            let mut row = CascadeStats::default();
            for &column in &columns {
                if self.store.has_steps(column) {
                    self.recompute(&evaluator, table_api.id, column, &mut row);
                }
            }
            stats.merge(&row);
        }

        tracing::info!(column = %owner.name, updated = stats.cells_updated, "refreshed formula column");
        Ok(stats)
    }

    fn recompute(
        &self,
        evaluator: &Evaluator<'_>,
        table_api: TableApiId,
        column: ColumnId,
        stats: &mut CascadeStats,
    ) {
        let (cell, created) = match self.store.get_or_create_cell(table_api, column) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%table_api, %column, error = %e, "skipping dependent cell");
                stats.failures += 1;
                return;
            }
        };
        if created {
            stats.cells_created += 1;
        }

        self.cache.invalidate(cell.id);
        let value = evaluator.computed_value(&cell);
        if value.starts_with(ERROR_PREFIX) {
            tracing::warn!(cell = %cell.id, %value, "formula evaluated to an error");
            stats.formula_errors += 1;
        }

        match self.persist(&cell, &value) {
            Ok(_) => stats.cells_updated += 1,
            Err(e) => {
                tracing::warn!(cell = %cell.id, error = %e, "failed to persist computed value");
                stats.failures += 1;
            }
        }
    }

    fn persist(&self, cell: &Cell, value: &str) -> Result<Cell> {
        if cell.value == value {
            return Ok(cell.clone());
        }
        Ok(self.store.set_cell_value(cell.id, value)?)
    }
}
