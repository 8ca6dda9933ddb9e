//! Persistence collaborators: write tables and reports to disk.
//!
//! Output tables are plain tabular structures, so they serialize to row
//! formats without semantic loss. Write failures are fatal
//! ([`PipelineError::Write`]); the pipeline never leaves partial outputs
//! behind a swallowed error.

use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Value};

/// Write a dataset to a CSV file with a header row. Nulls become empty cells.
pub fn write_csv(dataset: &DataSet, path: impl AsRef<Path>) -> PipelineResult<()> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;

    wtr.write_record(dataset.schema.field_names())
        .map_err(|e| write_error(path, e))?;
    for row in &dataset.rows {
        wtr.write_record(row.iter().map(render_cell))
            .map_err(|e| write_error(path, e))?;
    }
    wtr.flush().map_err(|e| write_error(path, e))
}

/// Write a dataset as newline-delimited JSON, one object per row.
pub fn write_ndjson(dataset: &DataSet, path: impl AsRef<Path>) -> PipelineResult<()> {
    let path = path.as_ref();
    let mut file = File::create(path).map_err(|e| write_error(path, e))?;

    for row in &dataset.rows {
        let obj: serde_json::Map<String, serde_json::Value> = dataset
            .schema
            .field_names()
            .zip(row.iter().map(json_cell))
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        serde_json::to_writer(&mut file, &obj).map_err(|e| write_error(path, e))?;
        writeln!(file).map_err(|e| write_error(path, e))?;
    }
    Ok(())
}

/// Write any serializable report as pretty-printed JSON.
pub fn write_report_json<T: Serialize>(report: &T, path: impl AsRef<Path>) -> PipelineResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    serde_json::to_writer_pretty(file, report).map_err(|e| write_error(path, e))
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Int64(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        Value::Utf8(s) => s.clone(),
    }
}

fn json_cell(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int64(v) => serde_json::Value::from(*v),
        Value::Float64(v) => {
            // JSON has no NaN/Inf; such cells degrade to null.
            serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        }
        Value::Utf8(s) => serde_json::Value::from(s.as_str()),
    }
}

fn write_error(path: &Path, source: impl std::fmt::Display) -> PipelineError {
    PipelineError::Write {
        path: path.to_path_buf(),
        message: source.to_string(),
    }
}
