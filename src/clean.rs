//! Cleaning stage: coercion, missing-value repair, duplicate removal.
//!
//! The cleaner takes the raw table and returns one with the same columns,
//! guaranteed to have no duplicate identifiers and (under the default policy)
//! numeric cumulative charges wherever the repair rules can produce one.
//! Anomalies are counted on a [`CleanReport`], never raised as errors, except
//! when [`CleanOptions::fail_on_unresolved_missing`] is set.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};
use crate::schema::{CUSTOMER_ID, MONTHLY_CHARGES, TENURE, TOTAL_CHARGES};
use crate::types::{DataSet, DataType, Value};

/// Options controlling the cleaning stage.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Fail the stage if any cumulative charge is still missing after both
    /// repair rules (tenure == 0 -> 0, else monthly x tenure).
    ///
    /// The repair rules cover every row a well-formed feed can produce, so an
    /// unresolved value means the feed violated the tenure/charge precondition.
    /// The default keeps the row with a null and reports the count instead.
    pub fail_on_unresolved_missing: bool,
}

/// Data-quality counts reported by [`clean`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Cumulative-charge values that could not be coerced to numeric
    /// (blank or non-numeric text).
    pub coercion_failures: usize,
    /// Missing cumulative charges zeroed because tenure == 0 (new customer).
    pub zeroed_new_customers: usize,
    /// Missing cumulative charges imputed as monthly charge x tenure.
    pub imputed_from_monthly: usize,
    /// Cumulative charges still missing after both repair rules.
    pub unresolved_missing: usize,
    /// Rows dropped because their identifier already appeared earlier.
    pub duplicates_removed: usize,
}

/// Clean the raw table.
///
/// Operations, in order:
///
/// 1. Coerce the cumulative-charge column to `Float64`. Values that fail
///    coercion become null and are counted, not errored.
/// 2. Repair missing cumulative charges: zero for new customers
///    (tenure == 0), otherwise monthly charge x tenure. Whatever is still
///    missing afterwards is counted (or fatal under strict options).
/// 3. Drop rows whose identifier already occurred, keeping the first
///    occurrence in original order.
///
/// Fails with a schema-mismatch error if any of the four columns it operates
/// on is absent.
pub fn clean(dataset: &DataSet, options: &CleanOptions) -> PipelineResult<(DataSet, CleanReport)> {
    let idxs = dataset
        .schema
        .require(&[CUSTOMER_ID, TENURE, MONTHLY_CHARGES, TOTAL_CHARGES])?;
    let (id_idx, tenure_idx, monthly_idx, total_idx) = (idxs[0], idxs[1], idxs[2], idxs[3]);

    let mut report = CleanReport::default();
    let mut seen_ids: HashSet<String> = HashSet::with_capacity(dataset.row_count());
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(dataset.row_count());

    for row in &dataset.rows {
        // Duplicate identifiers: first occurrence wins.
        let id = match &row[id_idx] {
            Value::Utf8(s) => s.clone(),
            other => format!("{other:?}"),
        };
        if !seen_ids.insert(id) {
            report.duplicates_removed += 1;
            continue;
        }

        let mut row = row.clone();

        let mut total = match coerce_numeric(&row[total_idx]) {
            Coerced::Number(v) => Some(v),
            Coerced::Missing => None,
            Coerced::Failed => {
                report.coercion_failures += 1;
                None
            }
        };

        // A null tenure is outside the input contract; neither repair rule
        // applies and the charge is left as coerced (a missing one then counts
        // as unresolved below).
        match row[tenure_idx].as_f64() {
            Some(tenure) if tenure == 0.0 => {
                if total.is_none() {
                    report.zeroed_new_customers += 1;
                }
                total = Some(0.0);
            }
            Some(tenure) if total.is_none() => {
                if let Some(monthly) = row[monthly_idx].as_f64() {
                    total = Some(monthly * tenure);
                    report.imputed_from_monthly += 1;
                }
            }
            _ => {}
        }

        row[total_idx] = match total {
            Some(v) => Value::Float64(v),
            None => {
                report.unresolved_missing += 1;
                Value::Null
            }
        };
        rows.push(row);
    }

    if options.fail_on_unresolved_missing && report.unresolved_missing > 0 {
        return Err(PipelineError::DataQuality {
            message: format!(
                "{} cumulative-charge value(s) still missing after repair rules",
                report.unresolved_missing
            ),
        });
    }

    let mut schema = dataset.schema.clone();
    schema.fields[total_idx].data_type = DataType::Float64;

    Ok((DataSet::new(schema, rows), report))
}

enum Coerced {
    Number(f64),
    Missing,
    Failed,
}

fn coerce_numeric(value: &Value) -> Coerced {
    match value {
        Value::Null => Coerced::Missing,
        Value::Float64(v) => Coerced::Number(*v),
        Value::Int64(v) => Coerced::Number(*v as f64),
        Value::Utf8(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Coerced::Missing
            } else {
                match trimmed.parse::<f64>() {
                    Ok(v) => Coerced::Number(v),
                    Err(_) => Coerced::Failed,
                }
            }
        }
    }
}
