//! Column-name contract for the customer-attrition table.
//!
//! All stages address columns by these names. The raw table carries the 21
//! required source columns; the enriched table appends the ten derived columns
//! in [`DERIVED_COLUMNS`] order.

use crate::types::{DataType, Field, Schema, Value};

/// Unique customer identifier.
pub const CUSTOMER_ID: &str = "customerID";
/// Tenure in billing periods (integer, >= 0).
pub const TENURE: &str = "tenure";
/// Contract type: "Month-to-month", "One year" or "Two year".
pub const CONTRACT: &str = "Contract";
/// Monthly recurring charge.
pub const MONTHLY_CHARGES: &str = "MonthlyCharges";
/// Cumulative charge. Raw values are coercible text (may contain blanks).
pub const TOTAL_CHARGES: &str = "TotalCharges";
/// Attrition outcome label ("Yes"/"No").
pub const CHURN: &str = "Churn";

/// The add-on service subscription columns counted by the service-count feature.
pub const SERVICE_COLUMNS: [&str; 9] = [
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

/// Categorical values that mean "no service" and must not count as a
/// subscription.
pub const SERVICE_SENTINELS: [&str; 3] = ["No", "No phone service", "No internet service"];

/// Every column the raw table must provide, in source order.
pub const REQUIRED_COLUMNS: [&str; 21] = [
    CUSTOMER_ID,
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    TENURE,
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    CONTRACT,
    "PaperlessBilling",
    "PaymentMethod",
    MONTHLY_CHARGES,
    TOTAL_CHARGES,
    CHURN,
];

/// Derived column: 0/1 attrition flag.
pub const CHURN_FLAG: &str = "ChurnFlag";
/// Derived column: cumulative charge / (tenure + 1).
pub const AVG_CHARGE_PER_MONTH: &str = "AvgChargePerMonth";
/// Derived column: tenure bucket ("Short"/"Medium"/"Long").
pub const TENURE_GROUP: &str = "TenureGroup";
/// Derived column: 0/1, monthly charge above the population median.
pub const IS_PREMIUM: &str = "IsPremium";
/// Derived column: number of subscribed add-on services (0..=9).
pub const SERVICE_COUNT: &str = "ServiceCount";
/// Derived column: 0/1, any security-related service subscribed.
pub const HAS_SECURITY: &str = "HasSecurity";
/// Derived column: weighted satisfaction estimate.
pub const SATISFACTION_SCORE: &str = "SatisfactionScore";
/// Derived column: weighted sum of five attrition risk conditions.
pub const CHURN_RISK_SCORE: &str = "ChurnRiskScore";
/// Derived column: monthly charge min-max scaled to [0, 1].
pub const MONTHLY_CHARGES_SCALED: &str = "MonthlyChargesScaled";
/// Derived column: cumulative charge min-max scaled to [0, 1].
pub const TOTAL_CHARGES_SCALED: &str = "TotalChargesScaled";

/// The derived columns in the order the feature stage appends them.
///
/// The order encodes dependencies: the service count must exist before the
/// satisfaction and risk scores, and the security flag before the risk score.
pub const DERIVED_COLUMNS: [&str; 10] = [
    CHURN_FLAG,
    AVG_CHARGE_PER_MONTH,
    TENURE_GROUP,
    IS_PREMIUM,
    SERVICE_COUNT,
    HAS_SECURITY,
    SATISFACTION_SCORE,
    CHURN_RISK_SCORE,
    MONTHLY_CHARGES_SCALED,
    TOTAL_CHARGES_SCALED,
];

/// Schema of the raw input table.
///
/// `TotalCharges` is typed `Utf8` on purpose: raw feeds contain blanks and
/// non-numeric text there, and coercion to numeric is the cleaning stage's job
/// (failed coercions become nulls and a data-quality count, not ingest errors).
pub fn raw_schema() -> Schema {
    Schema::new(
        REQUIRED_COLUMNS
            .iter()
            .map(|name| {
                let data_type = match *name {
                    TENURE | "SeniorCitizen" => DataType::Int64,
                    MONTHLY_CHARGES => DataType::Float64,
                    _ => DataType::Utf8,
                };
                Field::new(*name, data_type)
            })
            .collect(),
    )
}

/// True if a service-column value counts as a subscription.
///
/// Nulls and the sentinel values in [`SERVICE_SENTINELS`] do not count;
/// anything else ("Yes", "DSL", "Fiber optic", ...) does.
pub fn is_service_subscribed(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Utf8(s) => !SERVICE_SENTINELS.contains(&s.as_str()),
        _ => true,
    }
}
