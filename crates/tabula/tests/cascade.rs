//! Tests for dependency cascades

use pretty_assertions::assert_eq;
use tabula::prelude::*;
use tabula::{CascadeContext, CascadeJob};

/// A, B = A + 5, C = B * 2
fn chain(policy: CascadePolicy) -> (Engine, Table, Column) {
    let engine = Engine::with_options(EngineOptions {
        cascade_policy: policy,
        ..Default::default()
    });
    let table = engine.create_table("Chain");
    let a = engine.add_column(table.id, "A", DataType::Number).unwrap();
    let b = engine.add_column(table.id, "B", DataType::Number).unwrap();
    let c = engine.add_column(table.id, "C", DataType::Number).unwrap();
    engine.set_formula(b.id, "A + 5").unwrap();
    engine.set_formula(c.id, "B * 2").unwrap();
    (engine, table, a)
}

fn persisted(engine: &Engine, row: &TableApi, name: &str) -> String {
    let column = engine.store().column_by_name(row.table, name).unwrap();
    engine
        .store()
        .find_cell(row.id, column.id)
        .map(|cell| cell.value)
        .unwrap_or_default()
}

#[test]
fn test_dependent_cell_is_created_and_updated() {
    let (engine, table, a) = chain(CascadePolicy::Transitive);
    let row = engine.create_table_api(table.id, None).unwrap();

    engine.save_cell(row.id, a.id, "10").unwrap();
    assert_eq!(persisted(&engine, &row, "B"), "15.0");

    engine.save_cell(row.id, a.id, "1").unwrap();
    assert_eq!(persisted(&engine, &row, "B"), "6.0");
}

#[test]
fn test_transitive_policy_reaches_second_hop() {
    let (engine, table, a) = chain(CascadePolicy::Transitive);
    let row = engine.create_table_api(table.id, None).unwrap();
    engine.save_cell(row.id, a.id, "10").unwrap();
    assert_eq!(persisted(&engine, &row, "B"), "15.0");
    assert_eq!(persisted(&engine, &row, "C"), "30.0");
}

#[test]
fn test_one_hop_policy_stops_after_direct_dependents() {
    let (engine, table, a) = chain(CascadePolicy::OneHop);
    let row = engine.create_table_api(table.id, None).unwrap();
    engine.save_cell(row.id, a.id, "10").unwrap();
    assert_eq!(persisted(&engine, &row, "B"), "15.0");
    assert_eq!(persisted(&engine, &row, "C"), "");

    // Reads still evaluate through the chain
    assert_eq!(engine.row_values(row.id).unwrap()["C"], "30.0");
}

#[test]
fn test_other_rows_are_untouched() {
    let (engine, table, a) = chain(CascadePolicy::Transitive);
    let first = engine.create_table_api(table.id, None).unwrap();
    let second = engine.create_table_api(table.id, None).unwrap();
    engine.save_cell(first.id, a.id, "10").unwrap();
    assert_eq!(persisted(&engine, &second, "B"), "");
    assert!(engine.store().cells_in(second.id).is_empty());
}

#[test]
fn test_write_inside_cascade_does_not_schedule() {
    let (engine, table, a) = chain(CascadePolicy::Transitive);
    let row = engine.create_table_api(table.id, None).unwrap();
    let origin = engine.save_cell(row.id, a.id, "10").unwrap();

    let ctx = CascadeContext::new(&CascadeJob::new(origin.id));
    engine.save_cell_within(&ctx, row.id, a.id, "99").unwrap();
    assert_eq!(persisted(&engine, &row, "A"), "99");
    // B still holds the value from the last scheduled cascade
    assert_eq!(persisted(&engine, &row, "B"), "15.0");
}

#[test]
fn test_runner_reports_stats() {
    let (engine, table, a) = chain(CascadePolicy::Transitive);
    let row = engine.create_table_api(table.id, None).unwrap();
    let origin = engine.save_cell(row.id, a.id, "2").unwrap();

    let runner = tabula::CascadeRunner::new(
        engine.store().clone(),
        engine.cache().clone(),
        CascadePolicy::Transitive,
    );
    let stats = runner.run(&CascadeJob::new(origin.id)).unwrap();
    assert_eq!(stats.cells_updated, 2);
    assert_eq!(stats.cells_created, 0);
    assert_eq!(stats.formula_errors, 0);
}

#[test]
fn test_failing_formula_is_persisted_as_error_string() {
    let engine = Engine::new();
    let table = engine.create_table("Mixed");
    let label = engine.add_column(table.id, "Label", DataType::Text).unwrap();
    let out = engine.add_column(table.id, "Out", DataType::Number).unwrap();
    engine.set_formula(out.id, "Label + 1").unwrap();

    let row = engine.create_table_api(table.id, None).unwrap();
    engine.save_cell(row.id, label.id, "abc").unwrap();
    assert!(persisted(&engine, &row, "Out").starts_with("Error in formula: "));
}

#[test]
fn test_cycle_does_not_hang() {
    let engine = Engine::new();
    let table = engine.create_table("Loop");
    let x = engine.add_column(table.id, "X", DataType::Number).unwrap();
    let y = engine.add_column(table.id, "Y", DataType::Number).unwrap();
    engine.set_formula(y.id, "X + 1").unwrap();

    let err = engine.set_formula(x.id, "Y + 1").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid formula: formula of column 'X' depends on itself through other columns"
    );
    assert!(!engine.store().has_steps(x.id));

    // Saved anyway, the loop is reported when read
    let update = engine.create_intermediate_columns(x.id, "Y + 1").unwrap();
    assert!(matches!(
        update.warnings[..],
        [ValidationIssue::CircularReference { .. }]
    ));

    let row = engine.create_table_api(table.id, None).unwrap();
    let values = engine.row_values(row.id).unwrap();
    assert!(values["X"].contains("Circular reference"));
}
