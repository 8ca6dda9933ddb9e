//! Feature engineering stage: derived columns and normalization.
//!
//! Takes the cleaned table and appends the ten derived columns of
//! [`crate::schema::DERIVED_COLUMNS`], in dependency order, then min-max scales
//! the two charge columns. Population-wide figures (medians, maxes, mins) are
//! computed once per run into a [`PopulationStats`] and reused for every row;
//! they are never cached across runs.
//!
//! The stage is all-or-nothing: if any base column is missing it fails with a
//! schema-mismatch error naming the missing column(s), and no partial feature
//! set is produced.

use crate::error::PipelineResult;
use crate::schema::{
    is_service_subscribed, AVG_CHARGE_PER_MONTH, CHURN, CHURN_FLAG, CHURN_RISK_SCORE, CONTRACT,
    HAS_SECURITY, IS_PREMIUM, MONTHLY_CHARGES, MONTHLY_CHARGES_SCALED, SATISFACTION_SCORE,
    SERVICE_COLUMNS, SERVICE_COUNT, TENURE, TENURE_GROUP, TOTAL_CHARGES, TOTAL_CHARGES_SCALED,
};
use crate::stats;
use crate::types::{DataSet, DataType, Field, Value};

/// Month-to-month contracts score no loyalty bonus and full churn risk.
const MONTH_TO_MONTH: &str = "Month-to-month";

/// Population-wide statistics precomputed once per run.
///
/// Every derived column that references the population (premium flag, score
/// normalizers, min-max scaling) reads from here, so each figure is computed
/// exactly once and every row sees the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationStats {
    /// Median monthly charge over all non-null rows.
    pub monthly_median: f64,
    /// Min/max monthly charge, for min-max scaling.
    pub monthly_min: f64,
    pub monthly_max: f64,
    /// Min/max cumulative charge, for min-max scaling.
    pub total_min: f64,
    pub total_max: f64,
    /// Maximum tenure, normalizer for the satisfaction score.
    pub tenure_max: f64,
    /// Maximum service count, normalizer for the satisfaction score.
    pub service_count_max: f64,
}

/// Tenure bucket with inclusive upper boundaries: <=12 short, <=36 medium,
/// otherwise long.
pub fn tenure_group(tenure: i64) -> &'static str {
    if tenure <= 12 {
        "Short"
    } else if tenure <= 36 {
        "Medium"
    } else {
        "Long"
    }
}

/// Count subscribed add-on services over a fixed column list.
///
/// Pure function of the row and the resolved service-column indexes; the
/// sentinel set lives in [`crate::schema::is_service_subscribed`].
pub fn service_count(row: &[Value], service_idxs: &[usize]) -> i64 {
    service_idxs
        .iter()
        .filter(|&&idx| is_service_subscribed(&row[idx]))
        .count() as i64
}

/// Min-max scale a value into [0, 1].
///
/// When the column is degenerate (min == max) every scaled value is defined as
/// 0, so a single-distinct-value column never divides by zero or yields NaN.
fn min_max_scale(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range == 0.0 {
        0.0
    } else {
        (value - min) / range
    }
}

/// Append the ten derived columns to the cleaned table.
///
/// Returns the enriched table together with the ordered list of column names
/// that were added, so callers can report what was created without the stage
/// holding any state between runs.
pub fn engineer(dataset: &DataSet) -> PipelineResult<(DataSet, Vec<String>)> {
    let base = dataset.schema.require(&[
        TENURE,
        CONTRACT,
        MONTHLY_CHARGES,
        TOTAL_CHARGES,
        CHURN,
        "TechSupport",
        "OnlineSecurity",
        "DeviceProtection",
    ])?;
    let (tenure_idx, contract_idx, monthly_idx, total_idx) = (base[0], base[1], base[2], base[3]);
    let (churn_idx, support_idx, security_idx, protection_idx) =
        (base[4], base[5], base[6], base[7]);
    let service_idxs = dataset.schema.require(&SERVICE_COLUMNS)?;

    let n = dataset.row_count();

    // Row-local ingredients needed before the population pass: the service
    // count feeds its own population max.
    let tenures: Vec<i64> = dataset
        .rows
        .iter()
        .map(|row| row[tenure_idx].as_f64().unwrap_or(0.0) as i64)
        .collect();
    let service_counts: Vec<i64> = dataset
        .rows
        .iter()
        .map(|row| service_count(row, &service_idxs))
        .collect();

    let pop = population_stats(dataset, monthly_idx, total_idx, &tenures, &service_counts);

    let mut churn_flags = Vec::with_capacity(n);
    let mut avg_charges = Vec::with_capacity(n);
    let mut tenure_groups = Vec::with_capacity(n);
    let mut premium_flags = Vec::with_capacity(n);
    let mut security_flags = Vec::with_capacity(n);
    let mut satisfaction = Vec::with_capacity(n);
    let mut risk = Vec::with_capacity(n);
    let mut monthly_scaled = Vec::with_capacity(n);
    let mut total_scaled = Vec::with_capacity(n);

    for (row_idx, row) in dataset.rows.iter().enumerate() {
        let tenure = tenures[row_idx];
        let services = service_counts[row_idx];
        let monthly = row[monthly_idx].as_f64();
        let total = row[total_idx].as_f64();
        let contract = row[contract_idx].as_str().unwrap_or("");

        // The outcome label is "Yes"/"No" in the raw feed, but an already
        // numeric 0/1 label is accepted too.
        let churned = match &row[churn_idx] {
            Value::Utf8(s) => s == "Yes",
            Value::Int64(v) => *v != 0,
            _ => false,
        };
        churn_flags.push(Value::Int64(i64::from(churned)));

        // An unresolved-missing cumulative charge (lenient cleaning) propagates
        // as null through the columns derived from it.
        avg_charges.push(match total {
            Some(t) => Value::Float64(t / (tenure as f64 + 1.0)),
            None => Value::Null,
        });

        tenure_groups.push(Value::Utf8(tenure_group(tenure).to_string()));

        let is_premium = monthly.is_some_and(|m| m > pop.monthly_median);
        premium_flags.push(Value::Int64(i64::from(is_premium)));

        let has_security = row[security_idx].as_str() == Some("Yes")
            || row[protection_idx].as_str() == Some("Yes");
        security_flags.push(Value::Int64(i64::from(has_security)));

        let loyalty_bonus = if contract != MONTH_TO_MONTH { 3.0 } else { 0.0 };
        let services_norm = if pop.service_count_max > 0.0 {
            services as f64 / pop.service_count_max * 3.0
        } else {
            0.0
        };
        let support_bonus = if row[support_idx].as_str() == Some("Yes") {
            2.0
        } else {
            0.0
        };
        let tenure_norm = if pop.tenure_max > 0.0 {
            tenure as f64 / pop.tenure_max * 2.0
        } else {
            0.0
        };
        satisfaction.push(Value::Float64(
            loyalty_bonus + services_norm + support_bonus + tenure_norm,
        ));

        let mut risk_score = 0;
        if contract == MONTH_TO_MONTH {
            risk_score += 3;
        }
        if tenure < 12 {
            risk_score += 2;
        }
        if services <= 2 {
            risk_score += 2;
        }
        if !has_security {
            risk_score += 1;
        }
        if is_premium {
            risk_score += 1;
        }
        risk.push(Value::Int64(risk_score));

        monthly_scaled.push(match monthly {
            Some(m) => Value::Float64(min_max_scale(m, pop.monthly_min, pop.monthly_max)),
            None => Value::Null,
        });
        total_scaled.push(match total {
            Some(t) => Value::Float64(min_max_scale(t, pop.total_min, pop.total_max)),
            None => Value::Null,
        });
    }

    let mut enriched = dataset.clone();
    let columns: [(&str, DataType, Vec<Value>); 10] = [
        (CHURN_FLAG, DataType::Int64, churn_flags),
        (AVG_CHARGE_PER_MONTH, DataType::Float64, avg_charges),
        (TENURE_GROUP, DataType::Utf8, tenure_groups),
        (IS_PREMIUM, DataType::Int64, premium_flags),
        (
            SERVICE_COUNT,
            DataType::Int64,
            service_counts.into_iter().map(Value::Int64).collect(),
        ),
        (HAS_SECURITY, DataType::Int64, security_flags),
        (SATISFACTION_SCORE, DataType::Float64, satisfaction),
        (CHURN_RISK_SCORE, DataType::Int64, risk),
        (MONTHLY_CHARGES_SCALED, DataType::Float64, monthly_scaled),
        (TOTAL_CHARGES_SCALED, DataType::Float64, total_scaled),
    ];

    let mut added = Vec::with_capacity(columns.len());
    for (name, data_type, values) in columns {
        enriched.append_column(Field::new(name, data_type), values);
        added.push(name.to_string());
    }

    Ok((enriched, added))
}

fn population_stats(
    dataset: &DataSet,
    monthly_idx: usize,
    total_idx: usize,
    tenures: &[i64],
    service_counts: &[i64],
) -> PopulationStats {
    let monthly = dataset.numeric_column(monthly_idx);
    let total = dataset.numeric_column(total_idx);

    PopulationStats {
        monthly_median: stats::median(&monthly).unwrap_or(0.0),
        monthly_min: stats::min(&monthly).unwrap_or(0.0),
        monthly_max: stats::max(&monthly).unwrap_or(0.0),
        total_min: stats::min(&total).unwrap_or(0.0),
        total_max: stats::max(&total).unwrap_or(0.0),
        tenure_max: tenures.iter().copied().max().unwrap_or(0) as f64,
        service_count_max: service_counts.iter().copied().max().unwrap_or(0) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::{engineer, tenure_group};
    use crate::schema::{self, DERIVED_COLUMNS};
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    /// Build a cleaned-shape dataset from (tenure, contract, monthly, total,
    /// churn, per-service values).
    fn cleaned_dataset(rows: Vec<(i64, &str, f64, f64, &str, [&str; 9])>) -> DataSet {
        let mut fields = vec![
            Field::new(schema::CUSTOMER_ID, DataType::Utf8),
            Field::new(schema::TENURE, DataType::Int64),
            Field::new(schema::CONTRACT, DataType::Utf8),
            Field::new(schema::MONTHLY_CHARGES, DataType::Float64),
            Field::new(schema::TOTAL_CHARGES, DataType::Float64),
            Field::new(schema::CHURN, DataType::Utf8),
        ];
        for name in schema::SERVICE_COLUMNS {
            fields.push(Field::new(name, DataType::Utf8));
        }

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, (tenure, contract, monthly, total, churn, services))| {
                let mut row = vec![
                    Value::Utf8(format!("c{i}")),
                    Value::Int64(tenure),
                    Value::Utf8(contract.to_string()),
                    Value::Float64(monthly),
                    Value::Float64(total),
                    Value::Utf8(churn.to_string()),
                ];
                row.extend(services.iter().map(|s| Value::Utf8(s.to_string())));
                row
            })
            .collect();

        DataSet::new(Schema::new(fields), rows)
    }

    const ALL_NO: [&str; 9] = [
        "No",
        "No phone service",
        "No",
        "No internet service",
        "No",
        "No",
        "No",
        "No",
        "No",
    ];
    const ALL_YES: [&str; 9] = [
        "Yes",
        "Yes",
        "Fiber optic",
        "Yes",
        "Yes",
        "Yes",
        "Yes",
        "Yes",
        "Yes",
    ];

    fn column(ds: &DataSet, name: &str) -> Vec<Value> {
        let idx = ds.schema.index_of(name).unwrap();
        ds.rows.iter().map(|row| row[idx].clone()).collect()
    }

    #[test]
    fn appends_exactly_the_ten_derived_columns_in_order() {
        let ds = cleaned_dataset(vec![(5, "Month-to-month", 50.0, 250.0, "No", ALL_NO)]);
        let (out, added) = engineer(&ds).unwrap();

        assert_eq!(out.column_count(), ds.column_count() + 10);
        assert_eq!(added, DERIVED_COLUMNS.map(String::from).to_vec());
        let tail: Vec<&str> = out.schema.fields[ds.column_count()..]
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(tail, DERIVED_COLUMNS.to_vec());
    }

    #[test]
    fn tenure_group_boundaries_are_inclusive_upper() {
        assert_eq!(tenure_group(0), "Short");
        assert_eq!(tenure_group(12), "Short");
        assert_eq!(tenure_group(13), "Medium");
        assert_eq!(tenure_group(36), "Medium");
        assert_eq!(tenure_group(37), "Long");
    }

    #[test]
    fn service_count_spans_zero_to_nine() {
        let ds = cleaned_dataset(vec![
            (1, "One year", 20.0, 20.0, "No", ALL_NO),
            (1, "One year", 90.0, 90.0, "No", ALL_YES),
        ]);
        let (out, _) = engineer(&ds).unwrap();
        assert_eq!(
            column(&out, schema::SERVICE_COUNT),
            vec![Value::Int64(0), Value::Int64(9)]
        );
    }

    #[test]
    fn churn_and_security_flags() {
        let mut with_security = ALL_NO;
        with_security[5] = "Yes"; // DeviceProtection
        let ds = cleaned_dataset(vec![
            (1, "One year", 20.0, 20.0, "Yes", ALL_NO),
            (1, "One year", 30.0, 30.0, "No", with_security),
        ]);
        let (out, _) = engineer(&ds).unwrap();
        assert_eq!(
            column(&out, schema::CHURN_FLAG),
            vec![Value::Int64(1), Value::Int64(0)]
        );
        assert_eq!(
            column(&out, schema::HAS_SECURITY),
            vec![Value::Int64(0), Value::Int64(1)]
        );
    }

    #[test]
    fn premium_flag_uses_population_median() {
        let ds = cleaned_dataset(vec![
            (1, "One year", 10.0, 10.0, "No", ALL_NO),
            (1, "One year", 20.0, 20.0, "No", ALL_NO),
            (1, "One year", 30.0, 30.0, "No", ALL_NO),
        ]);
        let (out, _) = engineer(&ds).unwrap();
        // Median is 20; only strictly-above counts.
        assert_eq!(
            column(&out, schema::IS_PREMIUM),
            vec![Value::Int64(0), Value::Int64(0), Value::Int64(1)]
        );
    }

    #[test]
    fn avg_charge_divides_by_tenure_plus_one() {
        let ds = cleaned_dataset(vec![(4, "One year", 20.0, 100.0, "No", ALL_NO)]);
        let (out, _) = engineer(&ds).unwrap();
        assert_eq!(
            column(&out, schema::AVG_CHARGE_PER_MONTH),
            vec![Value::Float64(20.0)]
        );
    }

    #[test]
    fn risk_score_sums_all_five_conditions() {
        let ds = cleaned_dataset(vec![
            // Month-to-month (+3), tenure < 12 (+2), <= 2 services (+2),
            // no security (+1), above median (+1) = 9.
            (3, "Month-to-month", 90.0, 270.0, "Yes", ALL_NO),
            (60, "Two year", 30.0, 1800.0, "No", ALL_YES),
        ]);
        let (out, _) = engineer(&ds).unwrap();
        assert_eq!(
            column(&out, schema::CHURN_RISK_SCORE),
            vec![Value::Int64(9), Value::Int64(0)]
        );
    }

    #[test]
    fn satisfaction_score_weights_components() {
        let ds = cleaned_dataset(vec![
            (10, "Two year", 50.0, 500.0, "No", ALL_YES),
            (5, "Month-to-month", 50.0, 250.0, "No", ALL_NO),
        ]);
        let (out, _) = engineer(&ds).unwrap();
        let scores = column(&out, schema::SATISFACTION_SCORE);
        // Row 0: 3 (contract) + 3 (9/9 services) + 2 (TechSupport) + 2 (10/10 tenure) = 10.
        assert_eq!(scores[0], Value::Float64(10.0));
        // Row 1: 0 + 0 (0 services) + 0 + 2 * 5/10 = 1.
        assert_eq!(scores[1], Value::Float64(1.0));
    }

    #[test]
    fn min_max_scaling_spans_unit_interval() {
        let ds = cleaned_dataset(vec![
            (1, "One year", 10.0, 100.0, "No", ALL_NO),
            (1, "One year", 20.0, 300.0, "No", ALL_NO),
            (1, "One year", 30.0, 500.0, "No", ALL_NO),
        ]);
        let (out, _) = engineer(&ds).unwrap();
        assert_eq!(
            column(&out, schema::MONTHLY_CHARGES_SCALED),
            vec![
                Value::Float64(0.0),
                Value::Float64(0.5),
                Value::Float64(1.0)
            ]
        );
        assert_eq!(
            column(&out, schema::TOTAL_CHARGES_SCALED),
            vec![
                Value::Float64(0.0),
                Value::Float64(0.5),
                Value::Float64(1.0)
            ]
        );
    }

    #[test]
    fn degenerate_column_scales_to_zero_not_nan() {
        let ds = cleaned_dataset(vec![
            (1, "One year", 55.0, 55.0, "No", ALL_NO),
            (2, "One year", 55.0, 55.0, "No", ALL_NO),
        ]);
        let (out, _) = engineer(&ds).unwrap();
        assert_eq!(
            column(&out, schema::MONTHLY_CHARGES_SCALED),
            vec![Value::Float64(0.0), Value::Float64(0.0)]
        );
        assert_eq!(
            column(&out, schema::TOTAL_CHARGES_SCALED),
            vec![Value::Float64(0.0), Value::Float64(0.0)]
        );
    }

    #[test]
    fn missing_base_columns_fail_the_whole_stage() {
        let schema = Schema::new(vec![Field::new(schema::TENURE, DataType::Int64)]);
        let ds = DataSet::new(schema, vec![vec![Value::Int64(1)]]);
        let err = engineer(&ds).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("schema mismatch"));
        assert!(msg.contains(schema::CONTRACT));
        assert!(msg.contains(schema::CHURN));
    }
}
