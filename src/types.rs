//! Core data model types for the pipeline.
//!
//! Every stage of the pipeline consumes and produces an in-memory [`DataSet`]: a
//! [`Schema`] (ordered list of typed [`Field`]s) plus row-major [`Value`] storage.
//! Datasets are never mutated in place across stage boundaries; each stage returns
//! a new dataset.

use crate::error::{PipelineError, PipelineResult};

/// Logical data type for a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// UTF-8 string (categorical columns, identifiers).
    Utf8,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// An ordered list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolve each named column to its index, or fail with a schema-mismatch
    /// error naming **all** missing columns at once.
    ///
    /// This is the column-name contract between stages: a stage that needs
    /// columns the previous stage did not provide must fail deterministically
    /// and say which ones.
    pub fn require(&self, names: &[&str]) -> PipelineResult<Vec<usize>> {
        let mut idxs = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.index_of(name) {
                Some(idx) => idxs.push(idx),
                None => missing.push(*name),
            }
        }
        if missing.is_empty() {
            Ok(idxs)
        } else {
            Err(PipelineError::SchemaMismatch {
                message: format!("missing required column(s): {}", missing.join(", ")),
            })
        }
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// True if the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value: `Int64` and `Float64` map to `f64`, everything
    /// else (including `Null`) maps to `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of the value, if it is `Utf8`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset preserves the original schema.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Append a derived column to the dataset.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have exactly one value per row. Derived
    /// columns are always computed from the dataset itself, so a mismatch is a
    /// programming error, not a data error.
    pub fn append_column(&mut self, field: Field, values: Vec<Value>) {
        assert!(
            values.len() == self.rows.len(),
            "column '{}' has {} values for {} rows",
            field.name,
            values.len(),
            self.rows.len()
        );
        self.schema.fields.push(field);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Collect the non-null numeric values of the column at `idx`.
    ///
    /// Non-numeric values are skipped like nulls.
    pub fn numeric_column(&self, idx: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(Value::as_f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataSet, DataType, Field, Schema, Value};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Utf8),
            Field::new("tenure", DataType::Int64),
            Field::new("charge", DataType::Float64),
        ]);
        let rows = vec![
            vec![
                Value::Utf8("a".to_string()),
                Value::Int64(3),
                Value::Float64(10.0),
            ],
            vec![Value::Utf8("b".to_string()), Value::Int64(0), Value::Null],
            vec![
                Value::Utf8("c".to_string()),
                Value::Int64(7),
                Value::Float64(5.5),
            ],
        ];
        DataSet::new(schema, rows)
    }

    #[test]
    fn schema_require_resolves_indexes() {
        let ds = sample_dataset();
        assert_eq!(ds.schema.require(&["tenure", "id"]).unwrap(), vec![1, 0]);
    }

    #[test]
    fn schema_require_names_all_missing_columns() {
        let ds = sample_dataset();
        let err = ds.schema.require(&["tenure", "nope", "also_nope"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("schema mismatch"));
        assert!(msg.contains("nope"));
        assert!(msg.contains("also_nope"));
        assert!(!msg.contains("tenure"));
    }

    #[test]
    fn filter_rows_preserves_schema_and_order() {
        let ds = sample_dataset();
        let idx = ds.schema.index_of("tenure").unwrap();
        let out = ds.filter_rows(|row| matches!(row.get(idx), Some(Value::Int64(v)) if *v > 0));
        assert_eq!(out.schema, ds.schema);
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.rows[0][0], Value::Utf8("a".to_string()));
        assert_eq!(out.rows[1][0], Value::Utf8("c".to_string()));
    }

    #[test]
    fn append_column_extends_schema_and_rows() {
        let mut ds = sample_dataset();
        ds.append_column(
            Field::new("flag", DataType::Int64),
            vec![Value::Int64(1), Value::Int64(0), Value::Int64(1)],
        );
        assert_eq!(ds.column_count(), 4);
        assert_eq!(ds.rows[2][3], Value::Int64(1));
    }

    #[test]
    #[should_panic(expected = "has 2 values for 3 rows")]
    fn append_column_panics_on_length_mismatch() {
        let mut ds = sample_dataset();
        ds.append_column(
            Field::new("flag", DataType::Int64),
            vec![Value::Int64(1), Value::Int64(0)],
        );
    }

    #[test]
    fn numeric_column_skips_nulls() {
        let ds = sample_dataset();
        let idx = ds.schema.index_of("charge").unwrap();
        assert_eq!(ds.numeric_column(idx), vec![10.0, 5.5]);
    }
}
