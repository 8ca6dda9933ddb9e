//! Aggregation stage: summary tables over the enriched dataset.
//!
//! Four independent tables are produced from the enriched table; none depends
//! on another's output, and all are regenerated from scratch each run:
//!
//! - [`contract_summary`]: per-contract-type metrics
//! - [`segment_summary`]: per-(tenure-bucket x premium-flag) metrics
//! - [`churned_profile`]: transposed descriptive statistics of attrited rows
//! - [`churn_correlations`]: numeric features ranked by correlation with the
//!   attrition flag
//!
//! Numeric cells of the two group-by tables are rounded to two decimals, which
//! is how these tables are consumed downstream.

pub mod group;

pub use group::{group_by, AggOp, AggSpec};

use crate::error::PipelineResult;
use crate::schema::{
    CHURN_FLAG, CHURN_RISK_SCORE, CONTRACT, CUSTOMER_ID, HAS_SECURITY, IS_PREMIUM,
    MONTHLY_CHARGES, SATISFACTION_SCORE, SERVICE_COUNT, TENURE, TENURE_GROUP, TOTAL_CHARGES,
};
use crate::stats;
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// The numeric features ranked against the attrition flag, in listing order.
/// Ties in correlation keep this order.
pub const CORRELATION_FEATURES: [&str; 8] = [
    TENURE,
    MONTHLY_CHARGES,
    TOTAL_CHARGES,
    SERVICE_COUNT,
    SATISFACTION_SCORE,
    IS_PREMIUM,
    HAS_SECURITY,
    CHURN_RISK_SCORE,
];

/// Per-contract-type summary: customer count, attrition totals and rate,
/// charge/tenure centers, mean service count and satisfaction.
pub fn contract_summary(dataset: &DataSet) -> PipelineResult<DataSet> {
    let out = group_by(
        dataset,
        &[CONTRACT],
        &[
            AggSpec::new(CUSTOMER_ID, AggOp::Count, "CustomerCount"),
            AggSpec::new(CHURN_FLAG, AggOp::Sum, "ChurnTotal"),
            AggSpec::new(CHURN_FLAG, AggOp::Mean, "ChurnRate"),
            AggSpec::new(MONTHLY_CHARGES, AggOp::Mean, "MonthlyChargesMean"),
            AggSpec::new(MONTHLY_CHARGES, AggOp::Median, "MonthlyChargesMedian"),
            AggSpec::new(TOTAL_CHARGES, AggOp::Mean, "TotalChargesMean"),
            AggSpec::new(TOTAL_CHARGES, AggOp::Median, "TotalChargesMedian"),
            AggSpec::new(TENURE, AggOp::Mean, "TenureMean"),
            AggSpec::new(TENURE, AggOp::Median, "TenureMedian"),
            AggSpec::new(SERVICE_COUNT, AggOp::Mean, "ServiceCountMean"),
            AggSpec::new(SATISFACTION_SCORE, AggOp::Mean, "SatisfactionMean"),
        ],
    )?;
    Ok(round_numeric(out))
}

/// Per-(tenure-bucket x premium-flag) segment summary.
pub fn segment_summary(dataset: &DataSet) -> PipelineResult<DataSet> {
    let out = group_by(
        dataset,
        &[TENURE_GROUP, IS_PREMIUM],
        &[
            AggSpec::new(CUSTOMER_ID, AggOp::Count, "CustomerCount"),
            AggSpec::new(CHURN_FLAG, AggOp::Sum, "ChurnTotal"),
            AggSpec::new(CHURN_FLAG, AggOp::Mean, "ChurnRate"),
            AggSpec::new(SATISFACTION_SCORE, AggOp::Mean, "SatisfactionMean"),
            AggSpec::new(SERVICE_COUNT, AggOp::Mean, "ServiceCountMean"),
        ],
    )?;
    Ok(round_numeric(out))
}

/// Descriptive statistics of the attrited population, one numeric feature per
/// row.
///
/// Restricts the table to rows with attrition flag == 1, then computes
/// count/mean/std/min/quartiles/max for every numeric column of the enriched
/// schema. Cells that are undefined on the restricted population (e.g. std of
/// a single row) are null.
pub fn churned_profile(dataset: &DataSet) -> PipelineResult<DataSet> {
    let flag_idx = dataset.schema.require(&[CHURN_FLAG])?[0];
    let churned = dataset.filter_rows(|row| matches!(row.get(flag_idx), Some(Value::Int64(1))));

    let fields = vec![
        Field::new("Feature", DataType::Utf8),
        Field::new("Count", DataType::Int64),
        Field::new("Mean", DataType::Float64),
        Field::new("Std", DataType::Float64),
        Field::new("Min", DataType::Float64),
        Field::new("P25", DataType::Float64),
        Field::new("Median", DataType::Float64),
        Field::new("P75", DataType::Float64),
        Field::new("Max", DataType::Float64),
    ];

    let mut rows = Vec::new();
    for (idx, field) in churned.schema.fields.iter().enumerate() {
        if !matches!(field.data_type, DataType::Int64 | DataType::Float64) {
            continue;
        }
        let values = churned.numeric_column(idx);
        let float = |v: Option<f64>| v.map(Value::Float64).unwrap_or(Value::Null);
        rows.push(vec![
            Value::Utf8(field.name.clone()),
            Value::Int64(values.len() as i64),
            float(stats::mean(&values)),
            float(stats::sample_std(&values)),
            float(stats::min(&values)),
            float(stats::quantile(&values, 0.25)),
            float(stats::median(&values)),
            float(stats::quantile(&values, 0.75)),
            float(stats::max(&values)),
        ]);
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

/// Pearson correlation of each feature in [`CORRELATION_FEATURES`] against the
/// attrition flag, sorted descending by value (sign-aware, not by magnitude).
///
/// Rows whose feature or flag value is null are excluded pairwise. A feature
/// with undefined correlation (constant column) gets a null cell and sorts
/// after every defined value.
pub fn churn_correlations(dataset: &DataSet) -> PipelineResult<DataSet> {
    let flag_idx = dataset.schema.require(&[CHURN_FLAG])?[0];
    let feature_idxs = dataset.schema.require(&CORRELATION_FEATURES)?;

    let mut entries: Vec<(String, Option<f64>)> = Vec::with_capacity(feature_idxs.len());
    for (name, &idx) in CORRELATION_FEATURES.iter().zip(&feature_idxs) {
        let mut xs = Vec::with_capacity(dataset.row_count());
        let mut ys = Vec::with_capacity(dataset.row_count());
        for row in &dataset.rows {
            if let (Some(x), Some(y)) = (row[idx].as_f64(), row[flag_idx].as_f64()) {
                xs.push(x);
                ys.push(y);
            }
        }
        entries.push((name.to_string(), stats::pearson(&xs, &ys)));
    }

    // Stable sort: descending by value, nulls last, ties in listing order.
    entries.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let schema = Schema::new(vec![
        Field::new("Feature", DataType::Utf8),
        Field::new("Correlation", DataType::Float64),
    ]);
    let rows = entries
        .into_iter()
        .map(|(name, corr)| {
            vec![
                Value::Utf8(name),
                corr.map(Value::Float64).unwrap_or(Value::Null),
            ]
        })
        .collect();
    Ok(DataSet::new(schema, rows))
}

/// Round every float cell to two decimals.
fn round_numeric(mut dataset: DataSet) -> DataSet {
    for row in &mut dataset.rows {
        for value in row.iter_mut() {
            if let Value::Float64(v) = value {
                *value = Value::Float64((*v * 100.0).round() / 100.0);
            }
        }
    }
    dataset
}
