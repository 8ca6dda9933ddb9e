//! Pipeline observability.
//!
//! The runner reports stage boundaries and data-quality warnings to an
//! optional [`PipelineObserver`]. Observers record metrics or logs; they never
//! influence control flow. Fatal errors are not routed through observers, they
//! propagate to the caller as [`crate::error::PipelineError`].

use std::fmt;
use std::sync::Arc;

/// The stages of one pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Cleaning: coercion, missing-value repair, duplicate removal.
    Clean,
    /// Feature engineering: derived columns and normalization.
    Features,
    /// Aggregation: the four summary tables.
    Aggregate,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Clean => "clean",
            PipelineStage::Features => "features",
            PipelineStage::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

/// Shape of the table a stage handed onward.
///
/// The aggregation stage produces four summary tables rather than one, so its
/// output counts are summed over those tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Rows received by the stage.
    pub rows_in: usize,
    /// Rows produced by the stage.
    pub rows_out: usize,
    /// Columns produced by the stage.
    pub columns_out: usize,
}

/// A recoverable data-quality anomaly, summarized as a count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQualityWarning {
    /// Stage that observed the anomaly.
    pub stage: PipelineStage,
    /// What happened (e.g. "values imputed from monthly charge").
    pub message: String,
    /// How many cells/rows were affected.
    pub count: usize,
}

/// Observer interface for pipeline runs.
pub trait PipelineObserver: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_started(&self, _stage: PipelineStage) {}

    /// Called when a stage completes successfully.
    fn on_stage_finished(&self, _stage: PipelineStage, _stats: StageStats) {}

    /// Called once per nonzero data-quality count a stage reports.
    fn on_data_quality(&self, _warning: &DataQualityWarning) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_stage_started(&self, stage: PipelineStage) {
        for o in &self.observers {
            o.on_stage_started(stage);
        }
    }

    fn on_stage_finished(&self, stage: PipelineStage, stats: StageStats) {
        for o in &self.observers {
            o.on_stage_finished(stage, stats);
        }
    }

    fn on_data_quality(&self, warning: &DataQualityWarning) {
        for o in &self.observers {
            o.on_data_quality(warning);
        }
    }
}

/// Logs pipeline events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl PipelineObserver for StdErrObserver {
    fn on_stage_started(&self, stage: PipelineStage) {
        eprintln!("[pipeline][start] stage={stage}");
    }

    fn on_stage_finished(&self, stage: PipelineStage, stats: StageStats) {
        eprintln!(
            "[pipeline][ok] stage={stage} rows_in={} rows_out={} columns_out={}",
            stats.rows_in, stats.rows_out, stats.columns_out
        );
    }

    fn on_data_quality(&self, warning: &DataQualityWarning) {
        eprintln!(
            "[pipeline][warn] stage={} {} count={}",
            warning.stage, warning.message, warning.count
        );
    }
}
