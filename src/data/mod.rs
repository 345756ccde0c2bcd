//! Ingestion boundary: delimited text in, validated `EquipmentTable` out.
//!
//! Nothing enters the model without passing `validate_schema` and the numeric
//! parse in `to_table`.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::model::{EquipmentRecord, EquipmentTable, NewDataset, Parameter};
use crate::summary::summarize;

pub const NAME_COLUMN: &str = "Equipment Name";
pub const TYPE_COLUMN: &str = "Type";

pub const REQUIRED_COLUMNS: [&str; 5] = [NAME_COLUMN, TYPE_COLUMN, "Flowrate", "Pressure", "Temperature"];

/// Header plus raw cells, exactly as read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Positions of the required columns inside a `RawTable` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub name: usize,
    pub equipment_type: usize,
    pub flowrate: usize,
    pub pressure: usize,
    pub temperature: usize,
}

impl ColumnIndex {
    fn numeric(&self, param: Parameter) -> usize {
        match param {
            Parameter::Flowrate => self.flowrate,
            Parameter::Pressure => self.pressure,
            Parameter::Temperature => self.temperature,
        }
    }
}

impl RawTable {
    /// Read comma-delimited text with a header row. An empty stream yields an
    /// empty header, which then fails schema validation. Empty lines are
    /// skipped by the reader; a line of empty cells is kept as a data row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = rdr.records();
        let header = match records.next() {
            Some(rec) => {
                let rec = rec.map_err(|e| EngineError::Malformed(e.to_string()))?;
                rec.iter().map(clean_label).collect()
            }
            None => Vec::new(),
        };

        let mut rows = Vec::new();
        for rec in records {
            let rec = rec.map_err(|e| EngineError::Malformed(e.to_string()))?;
            rows.push(rec.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self { header, rows })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(bytes)
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map(|s| s.as_str()).unwrap_or("")
    }

    /// Project the five required fields; extra columns are dropped here.
    pub fn to_table(&self, idx: &ColumnIndex) -> Result<EquipmentTable> {
        let mut records = Vec::with_capacity(self.rows.len());
        for row in 0..self.rows.len() {
            let flowrate = self.numeric(row, idx, Parameter::Flowrate)?;
            let pressure = self.numeric(row, idx, Parameter::Pressure)?;
            let temperature = self.numeric(row, idx, Parameter::Temperature)?;
            records.push(EquipmentRecord {
                name: self.cell(row, idx.name).trim().to_string(),
                equipment_type: self.cell(row, idx.equipment_type).trim().to_string(),
                flowrate,
                pressure,
                temperature,
            });
        }
        Ok(EquipmentTable::new(records))
    }

    fn numeric(&self, row: usize, idx: &ColumnIndex, param: Parameter) -> Result<f64> {
        let raw = self.cell(row, idx.numeric(param));
        parse_number(raw).ok_or_else(|| EngineError::Parse {
            row,
            column: param.column().to_string(),
            value: raw.to_string(),
        })
    }
}

fn clean_label(label: &str) -> String {
    label.trim_start_matches('\u{feff}').trim().to_string()
}

/// Finite reals only; `NaN` and infinities are rejected.
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Check the header is a superset of `REQUIRED_COLUMNS`.
///
/// Missing labels are reported in canonical order. The first occurrence of a
/// duplicated label wins.
pub fn validate_schema(header: &[String]) -> Result<ColumnIndex> {
    let find = |label: &str| header.iter().position(|h| h == label);
    let found: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|&c| find(c)).collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip(&found)
        .filter(|(_, pos)| pos.is_none())
        .map(|(c, _)| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::Schema { missing });
    }

    let at = |i: usize| found[i].unwrap_or_default();
    Ok(ColumnIndex {
        name: at(0),
        equipment_type: at(1),
        flowrate: at(2),
        pressure: at(3),
        temperature: at(4),
    })
}

/// Validate and parse an upload into a table.
pub fn parse_table(bytes: &[u8]) -> Result<EquipmentTable> {
    let raw = RawTable::from_bytes(bytes)?;
    let idx = validate_schema(&raw.header)?;
    raw.to_table(&idx)
}

pub fn read_table(path: &Path) -> Result<EquipmentTable> {
    let bytes = std::fs::read(path)?;
    parse_table(&bytes)
}

/// Validate, parse and summarize an upload. The summary is derived here, from
/// this exact table, and never recomputed later.
pub fn ingest(name: &str, bytes: &[u8], uploaded_at: DateTime<Utc>) -> Result<NewDataset> {
    let table = parse_table(bytes)?;
    let summary = summarize(&table);
    Ok(NewDataset {
        name: name.to_string(),
        uploaded_at,
        fingerprint: content_sha256(bytes),
        table,
        summary,
    })
}

pub fn content_sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                        Pump-1,Pump,10,2,25\n\
                        Valve-1,Valve,5,1,20\n";

    #[test]
    fn test_parse_good_table() {
        let table = parse_table(GOOD.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].name, "Pump-1");
        assert_eq!(table.records()[1].equipment_type, "Valve");
        assert_eq!(table.column(Parameter::Temperature), vec![25.0, 20.0]);
    }

    #[test]
    fn test_extra_and_reordered_columns() {
        let csv = "Temperature,Notes,Type,Equipment Name,Pressure,Flowrate\n\
                   99.5,spare,Reactor,R-7,3.25,-1.5\n";
        let table = parse_table(csv.as_bytes()).unwrap();
        let rec = &table.records()[0];
        assert_eq!(rec.name, "R-7");
        assert_eq!(rec.equipment_type, "Reactor");
        assert_eq!(rec.flowrate, -1.5);
        assert_eq!(rec.pressure, 3.25);
        assert_eq!(rec.temperature, 99.5);
    }

    #[test]
    fn test_missing_pressure_is_schema_error() {
        let csv = "Equipment Name,Type,Flowrate,Temperature\nPump-1,Pump,10,25\n";
        match parse_table(csv.as_bytes()) {
            Err(EngineError::Schema { missing }) => assert_eq!(missing, vec!["Pressure"]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_misses_everything() {
        match parse_table(b"") {
            Err(EngineError::Schema { missing }) => assert_eq!(missing.len(), 5),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = parse_table(b"Equipment Name,Type,Flowrate,Pressure,Temperature\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_bom_and_padding_in_header() {
        let csv = "\u{feff}Equipment Name , Type,Flowrate,Pressure,Temperature\nP,Pump,1,2,3\n";
        assert_eq!(parse_table(csv.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_non_numeric_cell_reports_row_and_column() {
        let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                   Pump-1,Pump,10,2,25\n\
                   Pump-2,Pump,fast,2,25\n";
        match parse_table(csv.as_bytes()) {
            Err(EngineError::Parse { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "Flowrate");
                assert_eq!(value, "fast");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_and_missing_cells_rejected() {
        let nan = "Equipment Name,Type,Flowrate,Pressure,Temperature\nP,Pump,1,NaN,3\n";
        assert!(matches!(parse_table(nan.as_bytes()), Err(EngineError::Parse { ref column, .. }) if column == "Pressure"));
        let short = "Equipment Name,Type,Flowrate,Pressure,Temperature\nP,Pump,1,2\n";
        assert!(matches!(parse_table(short.as_bytes()), Err(EngineError::Parse { ref column, .. }) if column == "Temperature"));
    }

    #[test]
    fn test_blank_cell_rows_keep_their_position() {
        let leading = "Equipment Name,Type,Flowrate,Pressure,Temperature\n,,,,\nP,Pump,bad,1,1\n";
        match parse_table(leading.as_bytes()) {
            Err(EngineError::Parse { row, column, .. }) => {
                assert_eq!(row, 0);
                assert_eq!(column, "Flowrate");
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        let raw = RawTable::from_bytes(b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP,Pump,1,1,1\n,,,,\n\n").unwrap();
        assert_eq!(raw.rows.len(), 2);
        assert!(matches!(parse_table(b"Equipment Name,Type,Flowrate,Pressure,Temperature\nP,Pump,1,1,1\n,,,,\n"), Err(EngineError::Parse { row: 1, .. })));
    }

    #[test]
    fn test_empty_lines_are_not_rows() {
        let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\nP,Pump,1,2,3\n\n";
        assert_eq!(parse_table(csv.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let missing = Path::new("/nonexistent/equipviz/plant.csv");
        let err = read_table(missing).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
        assert!(!err.kind().is_user_correctable());
        assert!(matches!(file_sha256(missing), Err(EngineError::Io(_))));
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\"Pump, north\",Pump,1,2,3\n";
        let table = parse_table(csv.as_bytes()).unwrap();
        assert_eq!(table.records()[0].name, "Pump, north");
    }

    #[test]
    fn test_ingest_fingerprints_bytes() {
        let ds = ingest("plant.csv", GOOD.as_bytes(), Utc::now()).unwrap();
        assert_eq!(ds.fingerprint, content_sha256(GOOD.as_bytes()));
        assert_eq!(ds.fingerprint.len(), 64);
        assert_eq!(ds.summary.total_count, 2);
    }
}
