//! CSV ingestion into an in-memory [`DataSet`], plus raw-data profiling.
//!
//! Ingestion is schema-first: the CSV must carry headers containing every
//! schema field (column order in the file does not matter), and each value is
//! parsed according to the field type. Empty cells become [`Value::Null`].
//!
//! The pipeline's raw table uses [`crate::schema::raw_schema`]; use
//! [`load_raw_csv`] for that common case.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::schema::{self, raw_schema};
use crate::types::{DataSet, DataType, Schema, Value};

/// Ingest a CSV file into an in-memory [`DataSet`].
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> PipelineResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Ingest CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> PipelineResult<DataSet> {
    let headers = rdr.headers()?.clone();

    // Map schema fields -> CSV column indexes (allows re-ordered CSV columns),
    // collecting every missing column before failing.
    let mut col_idxs = Vec::with_capacity(schema.fields.len());
    let mut missing = Vec::new();
    for field in &schema.fields {
        match headers.iter().position(|h| h == field.name) {
            Some(idx) => col_idxs.push(idx),
            None => missing.push(field.name.as_str()),
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::SchemaMismatch {
            message: format!("missing required column(s): {}", missing.join(", ")),
        });
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based row number for users; +1 again because the header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, &csv_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let raw = record.get(csv_idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &field.name, &field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

/// Load the raw customer-attrition table from a CSV file.
pub fn load_raw_csv(path: impl AsRef<Path>) -> PipelineResult<DataSet> {
    ingest_csv_from_path(path, &raw_schema())
}

fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: &DataType,
    raw: &str,
) -> PipelineResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed.parse::<i64>().map(Value::Int64).map_err(|e| {
            PipelineError::ParseError {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message: e.to_string(),
            }
        }),
        DataType::Float64 => trimmed.parse::<f64>().map(Value::Float64).map_err(|e| {
            PipelineError::ParseError {
                row,
                column: column.to_owned(),
                raw: raw.to_owned(),
                message: e.to_string(),
            }
        }),
    }
}

/// Profile of the raw table, computed before any cleaning.
///
/// Descriptive only: nothing here aborts the run, the numbers feed reports and
/// observer warnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawValidation {
    /// Total rows ingested.
    pub rows: usize,
    /// Total columns ingested.
    pub columns: usize,
    /// Rows whose identifier appeared earlier in the table.
    pub duplicate_ids: usize,
    /// Per-column null counts, listing only columns with at least one null.
    pub missing_by_column: Vec<(String, usize)>,
    /// Share of rows labelled as attrited, in percent. `None` when the
    /// outcome-label column is absent.
    pub churn_rate_pct: Option<f64>,
}

/// Profile the raw table: row/column totals, duplicate identifiers, per-column
/// missing counts and the attrition base rate.
pub fn validate_raw(dataset: &DataSet) -> RawValidation {
    let mut missing_by_column = Vec::new();
    for (idx, field) in dataset.schema.fields.iter().enumerate() {
        let nulls = dataset.rows.iter().filter(|row| row[idx].is_null()).count();
        if nulls > 0 {
            missing_by_column.push((field.name.clone(), nulls));
        }
    }

    let duplicate_ids = match dataset.schema.index_of(schema::CUSTOMER_ID) {
        Some(id_idx) => {
            let mut seen = HashSet::with_capacity(dataset.row_count());
            dataset
                .rows
                .iter()
                .filter(|row| !seen.insert(format!("{:?}", row[id_idx])))
                .count()
        }
        None => 0,
    };

    let churn_rate_pct = dataset.schema.index_of(schema::CHURN).and_then(|idx| {
        if dataset.rows.is_empty() {
            return None;
        }
        let churned = dataset
            .rows
            .iter()
            .filter(|row| row[idx].as_str() == Some("Yes"))
            .count();
        Some(churned as f64 / dataset.row_count() as f64 * 100.0)
    });

    RawValidation {
        rows: dataset.row_count(),
        columns: dataset.column_count(),
        duplicate_ids,
        missing_by_column,
        churn_rate_pct,
    }
}
