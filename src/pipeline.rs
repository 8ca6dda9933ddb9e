//! Top-level pipeline runner.
//!
//! Drives the three stages in order over one in-memory table: clean ->
//! engineer features -> aggregate. Each run owns its table exclusively; no
//! state survives between runs, and population statistics are recomputed from
//! scratch every time. On the first fatal error the run aborts with no partial
//! outputs.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{churn_correlations, churned_profile, contract_summary, segment_summary};
use crate::clean::{clean, CleanOptions, CleanReport};
use crate::error::PipelineResult;
use crate::features::engineer;
use crate::observe::{DataQualityWarning, PipelineObserver, PipelineStage, StageStats};
use crate::types::DataSet;

/// Options controlling a pipeline run.
#[derive(Clone, Default)]
pub struct PipelineOptions {
    /// Cleaning-stage options.
    pub clean: CleanOptions,
    /// Optional observer for stage events and data-quality warnings.
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("clean", &self.clean)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// Everything one pipeline run produces.
///
/// All tables are ephemeral: created once per run, never mutated afterwards,
/// and handed to the persistence collaborator as-is.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The cleaned table with the ten derived columns appended.
    pub enriched: DataSet,
    /// Names of the derived columns, in the order they were appended.
    pub features_added: Vec<String>,
    /// Per-contract-type summary.
    pub contract_summary: DataSet,
    /// Per-(tenure-bucket x premium-flag) summary.
    pub segment_summary: DataSet,
    /// Descriptive statistics of attrited customers, one feature per row.
    pub churned_profile: DataSet,
    /// Numeric features ranked by correlation with the attrition flag.
    pub churn_correlations: DataSet,
    /// Data-quality counts from the cleaning stage.
    pub clean_report: CleanReport,
    /// Run-level metrics for reporting.
    pub report: RunReport,
}

/// Run-level metrics, serializable for the text/JSON run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Rows and columns of the raw input table.
    pub rows_in: usize,
    pub columns_in: usize,
    /// Rows surviving the cleaning stage.
    pub rows_cleaned: usize,
    /// Columns of the enriched table.
    pub columns_enriched: usize,
    /// Derived columns created, in order.
    pub features_created: Vec<String>,
    /// Data-quality counts from cleaning.
    pub clean: CleanReport,
}

/// Run the full pipeline over a raw table.
pub fn run(raw: &DataSet, options: &PipelineOptions) -> PipelineResult<PipelineOutput> {
    let observer = options.observer.as_deref();

    stage_started(observer, PipelineStage::Clean);
    let (cleaned, clean_report) = clean(raw, &options.clean)?;
    stage_finished(observer, PipelineStage::Clean, raw, &cleaned);
    report_clean_warnings(observer, &clean_report);

    stage_started(observer, PipelineStage::Features);
    let (enriched, features_added) = engineer(&cleaned)?;
    stage_finished(observer, PipelineStage::Features, &cleaned, &enriched);

    stage_started(observer, PipelineStage::Aggregate);
    let contract_summary = contract_summary(&enriched)?;
    let segment_summary = segment_summary(&enriched)?;
    let churned_profile = churned_profile(&enriched)?;
    let churn_correlations = churn_correlations(&enriched)?;
    // Aggregation emits four tables; its output shape is their combined size.
    if let Some(obs) = observer {
        let tables = [
            &contract_summary,
            &segment_summary,
            &churned_profile,
            &churn_correlations,
        ];
        obs.on_stage_finished(
            PipelineStage::Aggregate,
            StageStats {
                rows_in: enriched.row_count(),
                rows_out: tables.iter().map(|t| t.row_count()).sum(),
                columns_out: tables.iter().map(|t| t.column_count()).sum(),
            },
        );
    }

    let report = RunReport {
        rows_in: raw.row_count(),
        columns_in: raw.column_count(),
        rows_cleaned: cleaned.row_count(),
        columns_enriched: enriched.column_count(),
        features_created: features_added.clone(),
        clean: clean_report,
    };

    Ok(PipelineOutput {
        enriched,
        features_added,
        contract_summary,
        segment_summary,
        churned_profile,
        churn_correlations,
        clean_report,
        report,
    })
}

fn stage_started(observer: Option<&dyn PipelineObserver>, stage: PipelineStage) {
    if let Some(obs) = observer {
        obs.on_stage_started(stage);
    }
}

fn stage_finished(
    observer: Option<&dyn PipelineObserver>,
    stage: PipelineStage,
    input: &DataSet,
    output: &DataSet,
) {
    if let Some(obs) = observer {
        obs.on_stage_finished(
            stage,
            StageStats {
                rows_in: input.row_count(),
                rows_out: output.row_count(),
                columns_out: output.column_count(),
            },
        );
    }
}

fn report_clean_warnings(observer: Option<&dyn PipelineObserver>, report: &CleanReport) {
    let Some(obs) = observer else {
        return;
    };
    let warnings = [
        ("cumulative charges failed numeric coercion", report.coercion_failures),
        ("new-customer charges zeroed", report.zeroed_new_customers),
        ("charges imputed from monthly charge", report.imputed_from_monthly),
        ("charges still missing after repair", report.unresolved_missing),
        ("duplicate identifiers removed", report.duplicates_removed),
    ];
    for (message, count) in warnings {
        if count > 0 {
            obs.on_data_quality(&DataQualityWarning {
                stage: PipelineStage::Clean,
                message: message.to_string(),
                count,
            });
        }
    }
}
