use equipviz::data::{file_sha256, read_table, content_sha256, REQUIRED_COLUMNS};
use equipviz::EngineError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_csv(path: &Path, header: &[&str], rows: &[&str]) {
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

#[test]
fn schema_accepts_good_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("good.csv");
    write_csv(&path, &REQUIRED_COLUMNS, &["Pump-1,Pump,10,2,25"]);
    let table = read_table(&path).unwrap();
    assert_eq!(table.len(), 1);
}

#[test]
fn schema_rejects_bad_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    write_csv(&path, &["Equipment Name", "Kind", "Flowrate"], &["Pump-1,Pump,10"]);
    match read_table(&path) {
        Err(EngineError::Schema { missing }) => {
            assert_eq!(missing, vec!["Type", "Pressure", "Temperature"]);
        }
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[test]
fn column_labels_are_case_sensitive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lower.csv");
    write_csv(
        &path,
        &["equipment name", "Type", "Flowrate", "Pressure", "Temperature"],
        &["Pump-1,Pump,10,2,25"],
    );
    match read_table(&path) {
        Err(EngineError::Schema { missing }) => assert_eq!(missing, vec!["Equipment Name"]),
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[test]
fn extra_columns_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("extra.csv");
    write_csv(
        &path,
        &["Site", "Equipment Name", "Type", "Flowrate", "Pressure", "Temperature", "Owner"],
        &["North,Pump-1,Pump,10,2,25,ops", "South,HX-2,HeatExchanger,0,-1.5,300,maint"],
    );
    let table = read_table(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.records()[1].equipment_type, "HeatExchanger");
    assert_eq!(table.records()[1].pressure, -1.5);
}

#[test]
fn bad_numeric_cell_names_row_and_column() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cells.csv");
    write_csv(
        &path,
        &REQUIRED_COLUMNS,
        &["Pump-1,Pump,10,2,25", "Pump-2,Pump,11,2,25", "Pump-3,Pump,12,2,hot"],
    );
    match read_table(&path) {
        Err(EngineError::Parse { row, column, value }) => {
            assert_eq!(row, 2);
            assert_eq!(column, "Temperature");
            assert_eq!(value, "hot");
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn file_hash_matches_content_hash() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hash.csv");
    write_csv(&path, &REQUIRED_COLUMNS, &["Pump-1,Pump,10,2,25"]);
    let bytes = fs::read(&path).unwrap();
    assert_eq!(file_sha256(&path).unwrap(), content_sha256(&bytes));
}
