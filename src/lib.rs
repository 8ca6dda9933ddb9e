//! `churn-pipeline` is a small library implementing a three-stage batch ETL
//! pipeline over customer-attrition data: ingest a flat CSV into an in-memory
//! [`types::DataSet`], clean and enrich it with derived features, and produce
//! aggregated summary tables for downstream analysis.
//!
//! ## Stages
//!
//! - **Clean** ([`clean`]): coerce the cumulative-charge column to numeric,
//!   repair missing values (zero for new customers, monthly charge x tenure
//!   otherwise), drop duplicate identifiers keeping the first occurrence.
//!   Anomalies are counted, not errored.
//! - **Features** ([`features`]): append ten derived columns in dependency
//!   order (attrition flag, charge averages, tenure bucket, premium flag,
//!   service count, security flag, satisfaction and risk scores, min-max
//!   scaled charges). Population statistics are computed once per run.
//! - **Aggregate** ([`aggregate`]): four independent summary tables via
//!   insertion-ordered group-by, a descriptive profile of attrited customers,
//!   and a correlation ranking against the attrition flag.
//!
//! The whole run is synchronous and single-threaded; each run owns its table
//! exclusively and aborts on the first fatal error with no partial outputs.
//!
//! ## Quick example
//!
//! ```no_run
//! use churn_pipeline::export::write_csv;
//! use churn_pipeline::ingest::load_raw_csv;
//! use churn_pipeline::pipeline::{run, PipelineOptions};
//!
//! # fn main() -> Result<(), churn_pipeline::PipelineError> {
//! let raw = load_raw_csv("telco_churn_raw.csv")?;
//! let out = run(&raw, &PipelineOptions::default())?;
//!
//! println!(
//!     "rows={} features={}",
//!     out.enriched.row_count(),
//!     out.features_added.len()
//! );
//! write_csv(&out.enriched, "telco_churn_transformed.csv")?;
//! write_csv(&out.contract_summary, "metrics_by_contract.csv")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Attach a [`observe::PipelineObserver`] to receive stage events and
//! data-quality warnings:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use churn_pipeline::ingest::load_raw_csv;
//! use churn_pipeline::observe::StdErrObserver;
//! use churn_pipeline::pipeline::{run, PipelineOptions};
//!
//! # fn main() -> Result<(), churn_pipeline::PipelineError> {
//! let raw = load_raw_csv("telco_churn_raw.csv")?;
//! let opts = PipelineOptions {
//!     observer: Some(Arc::new(StdErrObserver)),
//!     ..Default::default()
//! };
//! let _out = run(&raw, &opts)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: schema + in-memory dataset types
//! - [`schema`]: the customer-attrition column-name contract
//! - [`ingest`]: CSV ingestion and raw-data profiling
//! - [`clean`]: cleaning stage
//! - [`features`]: feature-engineering stage
//! - [`stats`]: descriptive statistics and correlation
//! - [`aggregate`]: group-by and the four summary tables
//! - [`pipeline`]: the top-level runner
//! - [`export`]: CSV/NDJSON/report writers
//! - [`observe`]: observer hooks for stage events and warnings
//! - [`error`]: error types used across the pipeline

pub mod aggregate;
pub mod clean;
pub mod error;
pub mod export;
pub mod features;
pub mod ingest;
pub mod observe;
pub mod pipeline;
pub mod schema;
pub mod stats;
pub mod types;

pub use error::{PipelineError, PipelineResult};
