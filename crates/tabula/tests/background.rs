//! Tests for cascades on the background scheduler

use pretty_assertions::assert_eq;
use tabula::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_cascade_settles() {
    let (engine, scheduler) = Engine::with_background(EngineOptions::default());
    let table = engine.create_table("Rooms");
    let width = engine.add_column(table.id, "Width", DataType::Number).unwrap();
    let area = engine.add_column(table.id, "Area", DataType::Number).unwrap();
    engine.set_formula(area.id, "Width * 2").unwrap();

    let row = engine.create_table_api(table.id, None).unwrap();
    for value in ["1", "2", "3"] {
        engine.save_cell(row.id, width.id, value).unwrap();
    }
    scheduler.settle().await;
    assert_eq!(scheduler.pending(), 0);

    let area_cell = engine.store().find_cell(row.id, area.id).unwrap();
    assert_eq!(area_cell.value, "6.0");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reads_do_not_wait_for_cascade() {
    let (engine, scheduler) = Engine::with_background(EngineOptions::default());
    let table = engine.create_table("Rooms");
    let width = engine.add_column(table.id, "Width", DataType::Number).unwrap();
    let area = engine.add_column(table.id, "Area", DataType::Number).unwrap();
    engine.set_formula(area.id, "Width + 1").unwrap();

    let row = engine.create_table_api(table.id, None).unwrap();
    engine.save_cell(row.id, width.id, "9").unwrap();

    // Evaluated on read regardless of where the job is
    assert_eq!(engine.row_values(row.id).unwrap()["Area"], "10.0");
    scheduler.settle().await;
}

#[tokio::test]
async fn test_settle_with_nothing_pending() {
    let (_engine, scheduler) = Engine::with_background(EngineOptions::default());
    scheduler.settle().await;
    assert_eq!(scheduler.pending(), 0);
}
