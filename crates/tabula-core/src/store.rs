//! In-memory repository
//!
//! The [`Store`] owns every persisted record: tables, columns, select options,
//! table apis, cells and compiled formula steps. It is cheap to clone; clones
//! share the same data behind a mutex, so the evaluator, the engine and a
//! background cascade worker can all hold one.
//!
//! Two uniqueness constraints are enforced here rather than by convention:
//!
//! - a column name appears at most once per table
//! - a cell exists at most once per `(table api, column)` pair
//!
//! [`Store::get_or_create_cell`] and [`Store::get_or_create_column`] are atomic
//! under the store lock, so concurrent writers can never create duplicates.

use std::sync::{Arc, Mutex, MutexGuard};

use ahash::AHashMap;

use crate::cell::Cell;
use crate::column::{Column, DataType, SelectOption};
use crate::error::{Error, Result};
use crate::formula::FormulaStep;
use crate::id::{CellId, ColumnId, TableApiId, TableId};
use crate::table::{Table, TableApi};

/// Shared in-memory store
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    tables: AHashMap<TableId, Table>,
    /// Table → columns in creation order
    table_columns: AHashMap<TableId, Vec<ColumnId>>,
    columns: AHashMap<ColumnId, Column>,
    /// (table, name) → column; enforces unique names
    column_names: AHashMap<(TableId, String), ColumnId>,
    options: AHashMap<ColumnId, Vec<SelectOption>>,
    table_apis: AHashMap<TableApiId, TableApi>,
    /// Table → table apis in creation order
    table_table_apis: AHashMap<TableId, Vec<TableApiId>>,
    cells: AHashMap<CellId, Cell>,
    /// (table api, column) → cell; enforces one cell per pair
    cell_index: AHashMap<(TableApiId, ColumnId), CellId>,
    /// Column → its steps sorted by order
    steps: AHashMap<ColumnId, Vec<FormulaStep>>,
}

impl Store {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("store mutex poisoned")
    }

    // === Tables ===

    /// Create a table
    pub fn create_table(&self, name: &str) -> Table {
        let table = Table::new(name);
        let mut inner = self.lock();
        inner.table_columns.insert(table.id, Vec::new());
        inner.table_table_apis.insert(table.id, Vec::new());
        inner.tables.insert(table.id, table.clone());
        table
    }

    /// Get a table by id
    pub fn table(&self, id: TableId) -> Result<Table> {
        self.lock()
            .tables
            .get(&id)
            .cloned()
            .ok_or(Error::TableNotFound(id))
    }

    // === Columns ===

    /// Add a column to a table
    ///
    /// Fails if the table already has a column with that name.
    pub fn add_column(&self, table: TableId, name: &str, data_type: DataType) -> Result<Column> {
        let mut inner = self.lock();
        if !inner.tables.contains_key(&table) {
            return Err(Error::TableNotFound(table));
        }
        if inner.column_names.contains_key(&(table, name.to_string())) {
            return Err(Error::DuplicateColumnName(name.to_string()));
        }
        Ok(inner.insert_column(Column::new(table, name, data_type)))
    }

    /// Look up a column by name, creating it with `data_type` if absent
    ///
    /// Returns the column and whether it was created.
    pub fn get_or_create_column(
        &self,
        table: TableId,
        name: &str,
        data_type: DataType,
    ) -> Result<(Column, bool)> {
        let mut inner = self.lock();
        if !inner.tables.contains_key(&table) {
            return Err(Error::TableNotFound(table));
        }
        if let Some(id) = inner.column_names.get(&(table, name.to_string())) {
            if let Some(column) = inner.columns.get(id) {
                return Ok((column.clone(), false));
            }
        }
        Ok((inner.insert_column(Column::new(table, name, data_type)), true))
    }

    /// Get a column by id
    pub fn column(&self, id: ColumnId) -> Result<Column> {
        self.lock()
            .columns
            .get(&id)
            .cloned()
            .ok_or(Error::ColumnNotFound(id))
    }

    /// Find a column by exact name within a table
    pub fn column_by_name(&self, table: TableId, name: &str) -> Option<Column> {
        let inner = self.lock();
        inner
            .column_names
            .get(&(table, name.to_string()))
            .and_then(|id| inner.columns.get(id))
            .cloned()
    }

    /// Columns of a table in creation order
    pub fn columns(&self, table: TableId) -> Result<Vec<Column>> {
        let inner = self.lock();
        let ids = inner
            .table_columns
            .get(&table)
            .ok_or(Error::TableNotFound(table))?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.columns.get(id))
            .cloned()
            .collect())
    }

    /// Store new formula source text on a column
    pub fn set_formula_text(&self, id: ColumnId, text: Option<String>) -> Result<Column> {
        let mut inner = self.lock();
        let column = inner.columns.get_mut(&id).ok_or(Error::ColumnNotFound(id))?;
        column.formula_text = text;
        Ok(column.clone())
    }

    /// Bump a column's generation, returning the new value
    pub fn bump_generation(&self, id: ColumnId) -> Result<u64> {
        let mut inner = self.lock();
        let column = inner.columns.get_mut(&id).ok_or(Error::ColumnNotFound(id))?;
        column.generation += 1;
        Ok(column.generation)
    }

    /// Delete a column with its steps, options and cells
    pub fn delete_column(&self, id: ColumnId) -> Result<()> {
        let mut inner = self.lock();
        let column = inner.columns.get(&id).ok_or(Error::ColumnNotFound(id))?;
        let table = column.table;
        if let Some(ids) = inner.table_columns.get_mut(&table) {
            ids.retain(|c| *c != id);
        }
        inner.remove_column(id);
        Ok(())
    }

    // === Select options ===

    /// Add an allowed value to a column
    pub fn add_option(&self, column: ColumnId, value: &str) -> Result<SelectOption> {
        let mut inner = self.lock();
        if !inner.columns.contains_key(&column) {
            return Err(Error::ColumnNotFound(column));
        }
        let option = SelectOption::new(column, value);
        inner
            .options
            .entry(column)
            .or_default()
            .push(option.clone());
        Ok(option)
    }

    /// Allowed values of a column
    pub fn options(&self, column: ColumnId) -> Vec<SelectOption> {
        self.lock().options.get(&column).cloned().unwrap_or_default()
    }

    // === Table apis ===

    /// Create a table api, optionally nested under `parent`
    pub fn create_table_api(
        &self,
        table: TableId,
        parent: Option<TableApiId>,
    ) -> Result<TableApi> {
        let mut inner = self.lock();
        if !inner.tables.contains_key(&table) {
            return Err(Error::TableNotFound(table));
        }
        if let Some(parent) = parent {
            if !inner.table_apis.contains_key(&parent) {
                return Err(Error::TableApiNotFound(parent));
            }
        }
        let api = TableApi::new(table, parent);
        inner
            .table_table_apis
            .entry(table)
            .or_default()
            .push(api.id);
        inner.table_apis.insert(api.id, api.clone());
        Ok(api)
    }

    /// Get a table api by id
    pub fn table_api(&self, id: TableApiId) -> Result<TableApi> {
        self.lock()
            .table_apis
            .get(&id)
            .cloned()
            .ok_or(Error::TableApiNotFound(id))
    }

    /// Table apis of a table in creation order
    pub fn table_apis(&self, table: TableId) -> Result<Vec<TableApi>> {
        let inner = self.lock();
        let ids = inner
            .table_table_apis
            .get(&table)
            .ok_or(Error::TableNotFound(table))?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.table_apis.get(id))
            .cloned()
            .collect())
    }

    /// Direct children of a table api
    pub fn children(&self, id: TableApiId) -> Vec<TableApi> {
        let mut children: Vec<TableApi> = self
            .lock()
            .table_apis
            .values()
            .filter(|api| api.parent == Some(id))
            .cloned()
            .collect();
        children.sort_by_key(|api| api.created_at);
        children
    }

    /// Delete a table api, its cells and all nested table apis
    pub fn delete_table_api(&self, id: TableApiId) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let table = inner
            .table_apis
            .get(&id)
            .map(|api| api.table)
            .ok_or(Error::TableApiNotFound(id))?;
        inner.remove_table_api(id);
        if let Some(ids) = inner.table_table_apis.get_mut(&table) {
            ids.retain(|api| inner.table_apis.contains_key(api));
        }
        Ok(())
    }

    // === Cells ===

    /// Insert a new cell
    ///
    /// Fails if a cell already exists for the `(table api, column)` pair.
    pub fn insert_cell(&self, cell: Cell) -> Result<Cell> {
        let mut inner = self.lock();
        inner.check_cell_target(cell.table_api, cell.column)?;
        let key = (cell.table_api, cell.column);
        if inner.cell_index.contains_key(&key) {
            return Err(Error::DuplicateCell {
                table_api: cell.table_api,
                column: cell.column,
            });
        }
        inner.cell_index.insert(key, cell.id);
        inner.cells.insert(cell.id, cell.clone());
        Ok(cell)
    }

    /// Find the cell for `(table api, column)`, creating an empty one if absent
    ///
    /// Returns the cell and whether it was created.
    pub fn get_or_create_cell(
        &self,
        table_api: TableApiId,
        column: ColumnId,
    ) -> Result<(Cell, bool)> {
        let mut inner = self.lock();
        if let Some(cell) = inner
            .cell_index
            .get(&(table_api, column))
            .and_then(|id| inner.cells.get(id))
        {
            return Ok((cell.clone(), false));
        }
        inner.check_cell_target(table_api, column)?;
        let cell = Cell::empty(table_api, column);
        inner.cell_index.insert((table_api, column), cell.id);
        inner.cells.insert(cell.id, cell.clone());
        Ok((cell, true))
    }

    /// Get a cell by id
    pub fn cell(&self, id: CellId) -> Result<Cell> {
        self.lock()
            .cells
            .get(&id)
            .cloned()
            .ok_or(Error::CellNotFound(id))
    }

    /// Find the cell for `(table api, column)`
    pub fn find_cell(&self, table_api: TableApiId, column: ColumnId) -> Option<Cell> {
        let inner = self.lock();
        inner
            .cell_index
            .get(&(table_api, column))
            .and_then(|id| inner.cells.get(id))
            .cloned()
    }

    /// All cells of a table api
    pub fn cells_in(&self, table_api: TableApiId) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .lock()
            .cells
            .values()
            .filter(|cell| cell.table_api == table_api)
            .cloned()
            .collect();
        cells.sort_by_key(|cell| cell.created_at);
        cells
    }

    /// All cells of a column, across table apis
    pub fn cells_of_column(&self, column: ColumnId) -> Vec<Cell> {
        self.lock()
            .cells
            .values()
            .filter(|cell| cell.column == column)
            .cloned()
            .collect()
    }

    /// Overwrite a cell's value
    pub fn set_cell_value(&self, id: CellId, value: &str) -> Result<Cell> {
        let mut inner = self.lock();
        let cell = inner.cells.get_mut(&id).ok_or(Error::CellNotFound(id))?;
        cell.value = value.to_string();
        Ok(cell.clone())
    }

    // === Formula steps ===

    /// Steps of a column sorted by order
    pub fn steps(&self, column: ColumnId) -> Vec<FormulaStep> {
        self.lock().steps.get(&column).cloned().unwrap_or_default()
    }

    /// Check if a column has compiled steps
    pub fn has_steps(&self, column: ColumnId) -> bool {
        self.lock()
            .steps
            .get(&column)
            .map_or(false, |steps| !steps.is_empty())
    }

    /// Replace all steps of a column in one write
    pub fn replace_steps(&self, column: ColumnId, mut steps: Vec<FormulaStep>) -> Result<()> {
        let mut inner = self.lock();
        if !inner.columns.contains_key(&column) {
            return Err(Error::ColumnNotFound(column));
        }
        steps.sort_by_key(|step| step.order);
        if steps.is_empty() {
            inner.steps.remove(&column);
        } else {
            inner.steps.insert(column, steps);
        }
        Ok(())
    }

    /// Steps whose operand references `column`, from any formula
    pub fn steps_referencing(&self, column: ColumnId) -> Vec<FormulaStep> {
        self.lock()
            .steps
            .values()
            .flatten()
            .filter(|step| step.referenced_column() == Some(column))
            .cloned()
            .collect()
    }

    /// Every persisted step
    pub fn all_steps(&self) -> Vec<FormulaStep> {
        self.lock().steps.values().flatten().cloned().collect()
    }
}

impl StoreInner {
    fn insert_column(&mut self, column: Column) -> Column {
        self.column_names
            .insert((column.table, column.name.clone()), column.id);
        self.table_columns
            .entry(column.table)
            .or_default()
            .push(column.id);
        self.columns.insert(column.id, column.clone());
        column
    }

    fn remove_column(&mut self, id: ColumnId) {
        if let Some(column) = self.columns.remove(&id) {
            self.column_names.remove(&(column.table, column.name));
        }
        self.steps.remove(&id);
        self.options.remove(&id);
        let cells: Vec<CellId> = self
            .cells
            .values()
            .filter(|cell| cell.column == id)
            .map(|cell| cell.id)
            .collect();
        for cell in cells {
            if let Some(cell) = self.cells.remove(&cell) {
                self.cell_index.remove(&(cell.table_api, cell.column));
            }
        }
    }

    fn remove_table_api(&mut self, id: TableApiId) {
        let children: Vec<TableApiId> = self
            .table_apis
            .values()
            .filter(|api| api.parent == Some(id))
            .map(|api| api.id)
            .collect();
        for child in children {
            self.remove_table_api(child);
        }
        self.table_apis.remove(&id);
        let cells: Vec<CellId> = self
            .cells
            .values()
            .filter(|cell| cell.table_api == id)
            .map(|cell| cell.id)
            .collect();
        for cell in cells {
            if let Some(cell) = self.cells.remove(&cell) {
                self.cell_index.remove(&(cell.table_api, cell.column));
            }
        }
    }

    fn check_cell_target(&self, table_api: TableApiId, column: ColumnId) -> Result<()> {
        let api = self
            .table_apis
            .get(&table_api)
            .ok_or(Error::TableApiNotFound(table_api))?;
        let col = self
            .columns
            .get(&column)
            .ok_or(Error::ColumnNotFound(column))?;
        if api.table != col.table {
            return Err(Error::ColumnTableMismatch { table_api, column });
        }
        Ok(())
    }
}
