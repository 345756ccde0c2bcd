//! Validate and summarize a CSV without storing it.
//!
//! Run with: cargo run --bin dataset_manifest -- plant.csv

use equipviz::data::{file_sha256, RawTable, validate_schema, REQUIRED_COLUMNS};
use equipviz::summary::summarize;
use equipviz::EngineError;
use serde_json::json;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let path = PathBuf::from(env::args().nth(1).unwrap_or_else(|| "data/sample.csv".to_string()));

    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("cannot read {}: {}", path.display(), err);
            std::process::exit(1);
        }
    };

    let raw = match RawTable::from_bytes(&bytes) {
        Ok(r) => r,
        Err(err) => {
            eprintln!("unreadable input: {}", err);
            std::process::exit(1);
        }
    };

    let idx = match validate_schema(&raw.header) {
        Ok(idx) => idx,
        Err(EngineError::Schema { missing }) => {
            eprintln!("schema mismatch, missing: {:?}", missing);
            eprintln!("required columns: {:?}", REQUIRED_COLUMNS);
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("schema check failed: {}", err);
            std::process::exit(2);
        }
    };

    let table = match raw.to_table(&idx) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("parse failed: {}", err);
            std::process::exit(3);
        }
    };

    let fingerprint = match file_sha256(&path) {
        Ok(h) => h,
        Err(err) => {
            eprintln!("hash failed: {}", err);
            std::process::exit(4);
        }
    };

    let ignored: Vec<&String> = raw
        .header
        .iter()
        .filter(|h| !REQUIRED_COLUMNS.contains(&h.as_str()))
        .collect();

    let payload = json!({
        "path": path.display().to_string(),
        "hash_sha256": fingerprint,
        "row_count": table.len(),
        "columns": raw.header,
        "ignored_columns": ignored,
        "summary": summarize(&table),
    });
    match serde_json::to_string_pretty(&payload) {
        Ok(s) => println!("{}", s),
        Err(err) => {
            eprintln!("encode failed: {}", err);
            std::process::exit(4);
        }
    }
}
