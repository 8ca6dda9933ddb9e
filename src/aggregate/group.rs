//! Insertion-ordered group-by with per-group reducers.

use std::collections::HashMap;

use crate::error::PipelineResult;
use crate::stats;
use crate::types::{DataSet, DataType, Field, Schema, Value};

/// Per-group reduction applied to one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    /// Number of rows in the group (nulls included).
    Count,
    /// Sum of non-null numeric values.
    Sum,
    /// Mean of non-null numeric values.
    Mean,
    /// Median of non-null numeric values.
    Median,
}

/// One column reduction in a group-by spec: source column, reduction, output
/// column name.
#[derive(Debug, Clone)]
pub struct AggSpec {
    pub column: String,
    pub op: AggOp,
    pub output: String,
}

impl AggSpec {
    pub fn new(column: impl Into<String>, op: AggOp, output: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            output: output.into(),
        }
    }
}

/// Group `dataset` by the named key columns and apply each reduction per group.
///
/// Output rows appear in first-seen order of the group key (hash maps do not
/// preserve insertion order, so the order is restored from an explicit
/// first-seen list), making the result deterministic given the input row
/// order. The output schema is the key fields followed by one field per
/// [`AggSpec`] (`Int64` for counts, `Float64` otherwise).
///
/// Fails with a schema-mismatch error naming any absent key or source column;
/// aggregations are never silently skipped.
pub fn group_by(dataset: &DataSet, keys: &[&str], aggs: &[AggSpec]) -> PipelineResult<DataSet> {
    let key_idxs = dataset.schema.require(keys)?;
    let agg_columns: Vec<&str> = aggs.iter().map(|a| a.column.as_str()).collect();
    let agg_idxs = dataset.schema.require(&agg_columns)?;

    // Group rows, remembering the first-seen order of each key.
    let mut group_of: HashMap<String, usize> = HashMap::new();
    let mut group_keys: Vec<Vec<Value>> = Vec::new();
    let mut group_rows: Vec<Vec<usize>> = Vec::new();

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let key = render_key(row, &key_idxs);
        let group_idx = *group_of.entry(key).or_insert_with(|| {
            group_keys.push(key_idxs.iter().map(|&i| row[i].clone()).collect());
            group_rows.push(Vec::new());
            group_keys.len() - 1
        });
        group_rows[group_idx].push(row_idx);
    }

    let mut fields: Vec<Field> = key_idxs
        .iter()
        .map(|&i| dataset.schema.fields[i].clone())
        .collect();
    for agg in aggs {
        let data_type = match agg.op {
            AggOp::Count => DataType::Int64,
            _ => DataType::Float64,
        };
        fields.push(Field::new(agg.output.clone(), data_type));
    }

    let mut rows = Vec::with_capacity(group_keys.len());
    for (key_values, member_rows) in group_keys.into_iter().zip(&group_rows) {
        let mut out = key_values;
        for (agg, &col_idx) in aggs.iter().zip(&agg_idxs) {
            out.push(reduce_group(dataset, member_rows, col_idx, agg.op));
        }
        rows.push(out);
    }

    Ok(DataSet::new(Schema::new(fields), rows))
}

fn reduce_group(dataset: &DataSet, member_rows: &[usize], col_idx: usize, op: AggOp) -> Value {
    if op == AggOp::Count {
        return Value::Int64(member_rows.len() as i64);
    }
    let values: Vec<f64> = member_rows
        .iter()
        .filter_map(|&row_idx| dataset.rows[row_idx][col_idx].as_f64())
        .collect();
    let result = match op {
        AggOp::Sum => {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum())
            }
        }
        AggOp::Mean => stats::mean(&values),
        AggOp::Median => stats::median(&values),
        AggOp::Count => unreachable!("count handled above"),
    };
    result.map(Value::Float64).unwrap_or(Value::Null)
}

/// Canonical text rendering of a group key.
///
/// Column values are joined with an unlikely separator; nulls render as a
/// marker distinct from any real categorical value.
fn render_key(row: &[Value], key_idxs: &[usize]) -> String {
    let mut key = String::new();
    for &idx in key_idxs {
        match &row[idx] {
            Value::Null => key.push_str("\u{0}null"),
            Value::Int64(v) => key.push_str(&v.to_string()),
            Value::Float64(v) => key.push_str(&v.to_string()),
            Value::Utf8(s) => key.push_str(s),
        }
        key.push('\u{1f}');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::{group_by, AggOp, AggSpec};
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("plan", DataType::Utf8),
            Field::new("flag", DataType::Int64),
            Field::new("amount", DataType::Float64),
        ]);
        let row = |plan: &str, flag: i64, amount: Value| {
            vec![Value::Utf8(plan.to_string()), Value::Int64(flag), amount]
        };
        DataSet::new(
            schema,
            vec![
                row("b", 1, Value::Float64(10.0)),
                row("a", 0, Value::Float64(20.0)),
                row("b", 0, Value::Null),
                row("a", 1, Value::Float64(40.0)),
                row("b", 1, Value::Float64(30.0)),
            ],
        )
    }

    #[test]
    fn groups_appear_in_first_seen_order() {
        let ds = sample_dataset();
        let out = group_by(
            &ds,
            &["plan"],
            &[AggSpec::new("amount", AggOp::Count, "n")],
        )
        .unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0][0], Value::Utf8("b".to_string()));
        assert_eq!(out.rows[1][0], Value::Utf8("a".to_string()));
    }

    #[test]
    fn reducers_skip_nulls_but_count_all_rows() {
        let ds = sample_dataset();
        let out = group_by(
            &ds,
            &["plan"],
            &[
                AggSpec::new("amount", AggOp::Count, "n"),
                AggSpec::new("amount", AggOp::Sum, "total"),
                AggSpec::new("amount", AggOp::Mean, "avg"),
                AggSpec::new("amount", AggOp::Median, "mid"),
            ],
        )
        .unwrap();

        // Group "b": rows 10, null, 30.
        assert_eq!(out.rows[0][1], Value::Int64(3));
        assert_eq!(out.rows[0][2], Value::Float64(40.0));
        assert_eq!(out.rows[0][3], Value::Float64(20.0));
        assert_eq!(out.rows[0][4], Value::Float64(20.0));
        // Group "a": rows 20, 40.
        assert_eq!(out.rows[1][1], Value::Int64(2));
        assert_eq!(out.rows[1][2], Value::Float64(60.0));
    }

    #[test]
    fn multi_key_grouping_keeps_key_columns() {
        let ds = sample_dataset();
        let out = group_by(
            &ds,
            &["plan", "flag"],
            &[AggSpec::new("amount", AggOp::Count, "n")],
        )
        .unwrap();

        let keys: Vec<(String, i64)> = out
            .rows
            .iter()
            .map(|row| {
                let plan = row[0].as_str().unwrap().to_string();
                let flag = match row[1] {
                    Value::Int64(v) => v,
                    _ => panic!("flag should be int"),
                };
                (plan, flag)
            })
            .collect();
        assert_eq!(
            keys,
            vec![
                ("b".to_string(), 1),
                ("a".to_string(), 0),
                ("b".to_string(), 0),
                ("a".to_string(), 1),
            ]
        );
        assert_eq!(out.rows[0][2], Value::Int64(2));
    }

    #[test]
    fn per_group_counts_sum_to_total_rows() {
        let ds = sample_dataset();
        let out = group_by(
            &ds,
            &["plan"],
            &[AggSpec::new("amount", AggOp::Count, "n")],
        )
        .unwrap();
        let total: i64 = out
            .rows
            .iter()
            .map(|row| match row[1] {
                Value::Int64(v) => v,
                _ => 0,
            })
            .sum();
        assert_eq!(total, ds.row_count() as i64);
    }

    #[test]
    fn missing_columns_fail_instead_of_skipping() {
        let ds = sample_dataset();
        let err = group_by(
            &ds,
            &["plan"],
            &[AggSpec::new("no_such_column", AggOp::Sum, "x")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("no_such_column"));

        let err = group_by(&ds, &["nope"], &[]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
