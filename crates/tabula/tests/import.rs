//! Tests for bulk import

use std::io::Write;

use pretty_assertions::assert_eq;
use tabula::prelude::*;

fn rooms() -> (Engine, Table) {
    let engine = Engine::new();
    let table = engine.create_table("Rooms");
    engine.add_column(table.id, "Name", DataType::Text).unwrap();
    engine.add_column(table.id, "Width", DataType::Number).unwrap();
    let area = engine.add_column(table.id, "Area", DataType::Number).unwrap();
    engine.set_formula(area.id, "Width * 2").unwrap();
    (engine, table)
}

fn batch(rows: &[[&str; 2]]) -> ImportBatch {
    let mut batch = ImportBatch::new(vec!["Name".to_string(), "Width".to_string()]);
    for row in rows {
        batch.push_row(row.iter().map(|s| s.to_string()).collect());
    }
    batch
}

#[test]
fn test_import_creates_rows_and_cascades() {
    let (engine, table) = rooms();
    let report = engine
        .import_rows(
            table.id,
            &batch(&[["Kitchen", "3"], ["Hall", "4.5"]]),
            &ImportOptions::default(),
        )
        .unwrap();

    assert_eq!(report.table_apis.len(), 2);
    assert_eq!(report.cells_created, 4);
    assert_eq!(report.values_blanked, 0);

    let kitchen = engine.row_values(report.table_apis[0]).unwrap();
    assert_eq!(kitchen["Name"], "Kitchen");
    assert_eq!(kitchen["Width"], "3.0");
    assert_eq!(kitchen["Area"], "6.0");

    let hall = engine.row_values(report.table_apis[1]).unwrap();
    assert_eq!(hall["Area"], "9.0");
}

#[test]
fn test_non_strict_import_blanks_bad_numbers() {
    let (engine, table) = rooms();
    let report = engine
        .import_rows(
            table.id,
            &batch(&[["Kitchen", "wide"], ["Hall", "NaN"]]),
            &ImportOptions::default(),
        )
        .unwrap();

    assert_eq!(report.values_blanked, 1);
    let kitchen = engine.row_values(report.table_apis[0]).unwrap();
    assert_eq!(kitchen["Width"], "");
    assert_eq!(kitchen["Area"], "0.0");
}

#[test]
fn test_strict_import_rejects_whole_batch() {
    let (engine, table) = rooms();
    let err = engine
        .import_rows(
            table.id,
            &batch(&[["Kitchen", "3"], ["Hall", "wide"]]),
            &ImportOptions {
                strict_numeric: true,
            },
        )
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Import error: Invalid numeric value \"wide\" in column \"Width\" at row 3"
    );
    assert!(engine.store().table_apis(table.id).unwrap().is_empty());
}

#[test]
fn test_unmatched_headers() {
    let (engine, table) = rooms();
    let mut batch = ImportBatch::new(vec!["Name".to_string(), "Depth".to_string()]);
    batch.push_row(vec!["Kitchen".to_string(), "2".to_string()]);

    let err = engine
        .import_rows(table.id, &batch, &ImportOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("Columns [Depth]"));
}

#[test]
fn test_import_csv_file() {
    let (engine, table) = rooms();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "Name;Width").unwrap();
    writeln!(file, "Kitchen;3").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "Hall;5").unwrap();
    file.flush().unwrap();

    let csv = CsvReadOptions {
        delimiter: b';',
        ..Default::default()
    };
    let report = engine
        .import_csv(table.id, file.path(), &csv, &ImportOptions::default())
        .unwrap();
    assert_eq!(report.table_apis.len(), 2);

    let hall = engine.row_values(report.table_apis[1]).unwrap();
    assert_eq!(hall["Area"], "10.0");
}
