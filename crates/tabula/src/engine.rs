//! The engine: schema authoring, data entry and the read path
//!
//! # Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let engine = Engine::new();
//! let rooms = engine.create_table("Rooms");
//! let width = engine.add_column(rooms.id, "Width", DataType::Number).unwrap();
//! let area = engine.add_column(rooms.id, "Area", DataType::Number).unwrap();
//! engine.set_formula(area.id, "Width * 2").unwrap();
//!
//! let row = engine.create_table_api(rooms.id, None).unwrap();
//! engine.save_cell(row.id, width.id, "3").unwrap();
//!
//! let values = engine.row_values(row.id).unwrap();
//! assert_eq!(values.get("Area").map(String::as_str), Some("6.0"));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use tabula_core::{
    check_required, validate_value, Cell, CellId, Column, ColumnId, DataType, SelectOption, Store,
    Table, TableApi, TableApiId, TableId,
};
use tabula_formula::{
    recompile, validate, CompiledFormula, Evaluator, FormulaError, ValidationIssue, ValueCache,
};

use crate::cascade::{CascadeContext, CascadeJob, CascadeRunner, CascadeStats};
use crate::error::{Error, Result};
use crate::options::EngineOptions;
use crate::scheduler::{BackgroundScheduler, CascadeScheduler, InlineScheduler};

/// Outcome of a formula change
#[derive(Debug, Clone, Default)]
pub struct FormulaUpdate {
    pub compiled: CompiledFormula,
    /// Non-blocking issues found in the text
    pub warnings: Vec<ValidationIssue>,
    /// Persisted values rewritten for existing rows
    pub refreshed: CascadeStats,
}

/// Entry point for working with tables, formulas and cells
///
/// Clones share the same store, cache and scheduler.
#[derive(Debug, Clone)]
pub struct Engine {
    store: Store,
    cache: ValueCache,
    runner: CascadeRunner,
    scheduler: Arc<dyn CascadeScheduler>,
    options: EngineOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with default options and inline cascades
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create an engine with inline cascades
    pub fn with_options(options: EngineOptions) -> Self {
        let store = Store::new();
        let cache = ValueCache::with_limits(options.cache_ttl, options.cache_capacity);
        let runner = CascadeRunner::new(store.clone(), cache.clone(), options.cascade_policy);
        let scheduler = Arc::new(InlineScheduler::new(runner.clone()));
        Self::from_parts(store, cache, options, scheduler)
    }

    /// Create an engine whose cascades run on a tokio task
    ///
    /// Must be called inside a tokio runtime. The returned scheduler handle
    /// lets callers wait for queued cascades with
    /// [`settle`](BackgroundScheduler::settle).
    pub fn with_background(options: EngineOptions) -> (Self, Arc<BackgroundScheduler>) {
        let store = Store::new();
        let cache = ValueCache::with_limits(options.cache_ttl, options.cache_capacity);
        let runner = CascadeRunner::new(store.clone(), cache.clone(), options.cascade_policy);
        let scheduler = Arc::new(BackgroundScheduler::spawn(runner));
        let engine = Self::from_parts(store, cache, options, scheduler.clone());
        (engine, scheduler)
    }

    /// Assemble an engine from existing parts
    pub fn from_parts(
        store: Store,
        cache: ValueCache,
        options: EngineOptions,
        scheduler: Arc<dyn CascadeScheduler>,
    ) -> Self {
        let runner = CascadeRunner::new(store.clone(), cache.clone(), options.cascade_policy);
        Self {
            store,
            cache,
            runner,
            scheduler,
            options,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn cache(&self) -> &ValueCache {
        &self.cache
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    // === Schema authoring ===

    pub fn create_table(&self, name: &str) -> Table {
        let table = self.store.create_table(name);
        tracing::info!(table = %table.id, name, "created table");
        table
    }

    pub fn add_column(&self, table: TableId, name: &str, data_type: DataType) -> Result<Column> {
        let column = self.store.add_column(table, name, data_type)?;
        tracing::debug!(column = %column.id, name, %data_type, "added column");
        Ok(column)
    }

    /// Add an allowed value to a select column
    pub fn add_select_option(&self, column: ColumnId, value: &str) -> Result<SelectOption> {
        let owner = self.store.column(column)?;
        if owner.data_type != DataType::Select {
            return Err(tabula_core::Error::InvalidDataType(format!(
                "column '{}' is {}, options need a select column",
                owner.name, owner.data_type
            ))
            .into());
        }
        Ok(self.store.add_option(column, value)?)
    }

    /// Check formula text without changing anything
    pub fn validate_formula(&self, column: ColumnId, text: &str) -> Result<Vec<ValidationIssue>> {
        let owner = self.store.column(column)?;
        Ok(validate(text, &owner, &self.store))
    }

    /// Set (or clear, with blank text) a column's formula
    ///
    /// The text must validate cleanly: unknown columns, syntax problems and
    /// self references are all rejected and nothing changes. On success the
    /// steps are rebuilt, cached values for the column become stale, and the
    /// persisted values of existing rows are recomputed.
    pub fn set_formula(&self, column: ColumnId, text: &str) -> Result<FormulaUpdate> {
        let owner = self.store.column(column)?;
        if text.trim().is_empty() {
            return self.apply_formula(owner, None, Vec::new());
        }
        if owner.data_type != DataType::Number {
            return Err(FormulaError::NotAFormulaColumn(owner.name).into());
        }

        let issues = validate(text, &owner, &self.store);
        if !issues.is_empty() {
            let messages = issues.iter().map(ToString::to_string).collect();
            return Err(FormulaError::Invalid(messages).into());
        }
        self.apply_formula(owner, Some(text), Vec::new())
    }

    /// Set a formula, creating any column it names that does not exist yet
    ///
    /// New columns are number columns. Problems that do not stop compilation
    /// come back as warnings.
    pub fn create_intermediate_columns(&self, column: ColumnId, text: &str) -> Result<FormulaUpdate> {
        let owner = self.store.column(column)?;
        let warnings = validate(text, &owner, &self.store);
        let update = self.apply_formula(owner, Some(text), warnings)?;
        for created in &update.compiled.created_columns {
            tracing::info!(column = %created.name, "created intermediate column");
        }
        Ok(update)
    }

    fn apply_formula(
        &self,
        owner: Column,
        text: Option<&str>,
        warnings: Vec<ValidationIssue>,
    ) -> Result<FormulaUpdate> {
        let mut candidate = owner;
        candidate.formula_text = text.map(str::to_string);
        let compiled = recompile(&candidate, &self.store)?;
        self.store
            .set_formula_text(candidate.id, candidate.formula_text.clone())?;
        tracing::info!(
            column = %candidate.name,
            steps = compiled.steps.len(),
            created = compiled.created_columns.len(),
            "compiled formula"
        );

        let refreshed = self.runner.refresh_column(candidate.id)?;
        Ok(FormulaUpdate {
            compiled,
            warnings,
            refreshed,
        })
    }

    /// Delete a column that no other formula reads
    pub fn delete_column(&self, column: ColumnId) -> Result<()> {
        let owner = self.store.column(column)?;
        let mut dependents: Vec<String> = Vec::new();
        for step in self.store.steps_referencing(column) {
            if step.column == column {
                continue;
            }
            let name = self.store.column(step.column)?.name;
            if !dependents.contains(&name) {
                dependents.push(name);
            }
        }
        if !dependents.is_empty() {
            return Err(Error::ColumnInUse {
                column: owner.name,
                dependents,
            });
        }

        let cells: Vec<CellId> = self
            .store
            .cells_of_column(column)
            .iter()
            .map(|cell| cell.id)
            .collect();
        self.cache.invalidate_many(cells);
        self.store.delete_column(column)?;
        tracing::info!(column = %owner.name, "deleted column");
        Ok(())
    }

    // === Data entry ===

    pub fn create_table_api(&self, table: TableId, parent: Option<TableApiId>) -> Result<TableApi> {
        Ok(self.store.create_table_api(table, parent)?)
    }

    /// Delete a table api, its children and their cells
    pub fn delete_table_api(&self, table_api: TableApiId) -> Result<()> {
        let mut cells: Vec<CellId> = Vec::new();
        let mut queue = vec![table_api];
        while let Some(api) = queue.pop() {
            cells.extend(self.store.cells_in(api).iter().map(|cell| cell.id));
            queue.extend(self.store.children(api).iter().map(|child| child.id));
        }
        self.cache.invalidate_many(cells);
        Ok(self.store.delete_table_api(table_api)?)
    }

    /// Validate and persist a value, then cascade to dependent formulas
    pub fn save_cell(&self, table_api: TableApiId, column: ColumnId, value: &str) -> Result<Cell> {
        self.write_cell(table_api, column, value, None)
    }

    /// [`save_cell`](Self::save_cell) from inside a running cascade
    ///
    /// The value is validated and persisted but no new cascade is scheduled.
    pub fn save_cell_within(
        &self,
        ctx: &CascadeContext,
        table_api: TableApiId,
        column: ColumnId,
        value: &str,
    ) -> Result<Cell> {
        self.write_cell(table_api, column, value, Some(ctx))
    }

    /// Overwrite the value of an existing cell
    pub fn update_cell(&self, cell: CellId, value: &str) -> Result<Cell> {
        let existing = self.store.cell(cell)?;
        self.write_cell(existing.table_api, existing.column, value, None)
    }

    fn write_cell(
        &self,
        table_api: TableApiId,
        column: ColumnId,
        value: &str,
        ctx: Option<&CascadeContext>,
    ) -> Result<Cell> {
        let owner = self.store.column(column)?;
        let options = self.store.options(column);
        validate_value(&owner, &options, value)?;

        let cell = match self.store.find_cell(table_api, column) {
            Some(existing) => {
                check_required(&owner, existing.is_required, value)?;
                self.store.set_cell_value(existing.id, value)?
            }
            None => {
                let cell = Cell::new(table_api, column, value);
                check_required(&owner, cell.is_required, value)?;
                self.store.insert_cell(cell)?
            }
        };
        self.cache.invalidate(cell.id);

        match ctx {
            Some(ctx) => {
                tracing::debug!(cell = %cell.id, job_id = %ctx.job_id(), "write inside cascade, not scheduling");
            }
            None => self.schedule_cascade(cell.id)?,
        }
        Ok(cell)
    }

    pub(crate) fn schedule_cascade(&self, cell: CellId) -> Result<()> {
        let job = CascadeJob::new(cell);
        tracing::debug!(job_id = %job.job_id, %cell, "scheduling cascade");
        self.scheduler.schedule(job)
    }

    // === Read path ===

    /// The value users see for a cell
    pub fn computed_value(&self, cell: CellId) -> Result<String> {
        let cell = self.store.cell(cell)?;
        Ok(self.evaluator().computed_value(&cell))
    }

    /// Column name → computed value for every column of the table api's table
    ///
    /// Columns without a cell in this table api read as empty, except formula
    /// columns, which are evaluated (creating their cell).
    pub fn row_values(&self, table_api: TableApiId) -> Result<BTreeMap<String, String>> {
        let api = self.store.table_api(table_api)?;
        let evaluator = self.evaluator();
        let mut values = BTreeMap::new();
        for column in self.store.columns(api.table)? {
            let cell = match self.store.find_cell(table_api, column.id) {
                Some(cell) => Some(cell),
                None if self.store.has_steps(column.id) => {
                    Some(self.store.get_or_create_cell(table_api, column.id)?.0)
                }
                None => None,
            };
            let value = cell
                .map(|cell| evaluator.computed_value(&cell))
                .unwrap_or_default();
            values.insert(column.name, value);
        }
        Ok(values)
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.store).with_cache(&self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rooms() -> (Engine, Table, Column, Column) {
        let engine = Engine::new();
        let table = engine.create_table("Rooms");
        let width = engine.add_column(table.id, "Width", DataType::Number).unwrap();
        let area = engine.add_column(table.id, "Area", DataType::Number).unwrap();
        (engine, table, width, area)
    }

    #[test]
    fn test_save_cell_validates_value() {
        let (engine, table, width, _) = rooms();
        let row = engine.create_table_api(table.id, None).unwrap();
        assert!(matches!(
            engine.save_cell(row.id, width.id, "wide"),
            Err(Error::Core(tabula_core::Error::InvalidValue { .. }))
        ));
        assert!(matches!(
            engine.save_cell(row.id, width.id, ""),
            Err(Error::Core(tabula_core::Error::ValueRequired(_)))
        ));
    }

    #[test]
    fn test_blank_attachment_is_accepted() {
        let engine = Engine::new();
        let table = engine.create_table("Documents");
        let scan = engine.add_column(table.id, "Scan", DataType::File).unwrap();
        let photo = engine.add_column(table.id, "Photo", DataType::Image).unwrap();
        let row = engine.create_table_api(table.id, None).unwrap();
        assert_eq!(engine.save_cell(row.id, scan.id, "").unwrap().value, "");
        assert_eq!(engine.save_cell(row.id, photo.id, "").unwrap().value, "");
    }

    #[test]
    fn test_save_cell_updates_existing() {
        let (engine, table, width, _) = rooms();
        let row = engine.create_table_api(table.id, None).unwrap();
        let first = engine.save_cell(row.id, width.id, "3").unwrap();
        let second = engine.save_cell(row.id, width.id, "4").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(engine.store().cells_in(row.id).len(), 1);

        let third = engine.update_cell(first.id, "5").unwrap();
        assert_eq!(third.value, "5");
    }

    #[test]
    fn test_select_options() {
        let engine = Engine::new();
        let table = engine.create_table("Tickets");
        let status = engine.add_column(table.id, "Status", DataType::Select).unwrap();
        let title = engine.add_column(table.id, "Title", DataType::Text).unwrap();
        engine.add_select_option(status.id, "Open").unwrap();
        assert!(engine.add_select_option(title.id, "Open").is_err());

        let row = engine.create_table_api(table.id, None).unwrap();
        engine.save_cell(row.id, status.id, "Open").unwrap();
        assert!(matches!(
            engine.save_cell(row.id, status.id, "Closed"),
            Err(Error::Core(tabula_core::Error::InvalidOption { .. }))
        ));
    }

    #[test]
    fn test_set_formula_rejects_invalid_text() {
        let (engine, _, _, area) = rooms();
        let err = engine.set_formula(area.id, "Width * Depth").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid formula: Column 'Depth' does not exist in the table"
        );
        assert!(!engine.store().has_steps(area.id));
        assert_eq!(engine.store().column(area.id).unwrap().formula_text, None);
    }

    #[test]
    fn test_set_formula_on_text_column() {
        let engine = Engine::new();
        let table = engine.create_table("People");
        let name = engine.add_column(table.id, "Name", DataType::Text).unwrap();
        assert!(matches!(
            engine.set_formula(name.id, "1 + 1"),
            Err(Error::Formula(FormulaError::NotAFormulaColumn(_)))
        ));
    }

    #[test]
    fn test_clear_formula() {
        let (engine, _, _, area) = rooms();
        engine.set_formula(area.id, "Width * 2").unwrap();
        engine.set_formula(area.id, "  ").unwrap();
        assert!(!engine.store().has_steps(area.id));
        assert_eq!(engine.store().column(area.id).unwrap().formula_text, None);
    }

    #[test]
    fn test_create_intermediate_columns() {
        let (engine, table, _, area) = rooms();
        let update = engine
            .create_intermediate_columns(area.id, "Width * Depth")
            .unwrap();
        assert_eq!(update.compiled.created_columns.len(), 1);
        assert_eq!(update.warnings.len(), 1);
        let depth = engine.store().column_by_name(table.id, "Depth").unwrap();
        assert_eq!(depth.data_type, DataType::Number);
    }

    #[test]
    fn test_delete_column_in_use() {
        let (engine, _, width, area) = rooms();
        engine.set_formula(area.id, "Width * 2").unwrap();
        let err = engine.delete_column(width.id).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Column 'Width' is used by the formulas of: Area"
        );

        engine.delete_column(area.id).unwrap();
        engine.delete_column(width.id).unwrap();
    }

    #[test]
    fn test_delete_table_api_with_children() {
        let (engine, table, width, _) = rooms();
        let parent = engine.create_table_api(table.id, None).unwrap();
        let child = engine.create_table_api(table.id, Some(parent.id)).unwrap();
        engine.save_cell(child.id, width.id, "2").unwrap();

        engine.delete_table_api(parent.id).unwrap();
        assert!(engine.store().table_api(child.id).is_err());
        assert!(engine.store().cells_in(child.id).is_empty());
    }

    #[test]
    fn test_row_values() {
        let (engine, table, width, area) = rooms();
        engine.add_column(table.id, "Notes", DataType::Text).unwrap();
        engine.set_formula(area.id, "Width * 2").unwrap();
        let row = engine.create_table_api(table.id, None).unwrap();
        engine.save_cell(row.id, width.id, "4").unwrap();

        let values = engine.row_values(row.id).unwrap();
        assert_eq!(values["Width"], "4");
        assert_eq!(values["Area"], "8.0");
        assert_eq!(values["Notes"], "");
    }

    #[test]
    fn test_cache_stays_bounded() {
        let engine = Engine::with_options(EngineOptions {
            cache_ttl: std::time::Duration::from_millis(20),
            cache_capacity: 50,
            ..Default::default()
        });
        let table = engine.create_table("Rooms");
        let width = engine.add_column(table.id, "Width", DataType::Number).unwrap();
        let area = engine.add_column(table.id, "Area", DataType::Number).unwrap();
        engine.set_formula(area.id, "Width * 2").unwrap();

        for i in 0..200 {
            let row = engine.create_table_api(table.id, None).unwrap();
            engine.save_cell(row.id, width.id, &i.to_string()).unwrap();
            engine.row_values(row.id).unwrap();
        }
        assert!(engine.cache().len() <= 50);

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(engine.cache().len(), 0);
    }
}
