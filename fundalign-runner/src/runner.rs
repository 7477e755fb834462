//! Run orchestration: load → align → normalize → export.
//!
//! Two entry points:
//! - `run_pipeline()`: reads the configured document and writes both CSVs. Used by the CLI.
//! - `align_document()`: aligns an already-parsed document, no filesystem access.

use std::path::PathBuf;

use fundalign_core::{AlignError, Alignment, AlignmentPipeline, AlignmentReport, Table};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::config::{ConfigError, PipelineConfig};
use crate::export::{save_frame, save_table, ExportError};
use crate::loader::{build_input, read_document, LoadError};
use crate::normalize::{MinMaxScaler, NormalizeError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("alignment error: {0}")]
    Align(#[from] AlignError),
    #[error("normalize error: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

/// Summary of a completed run, as printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub symbol: String,
    pub rows: usize,
    pub columns: usize,
    pub normalized_columns: usize,
    /// BLAKE3 over the aligned rows in canonical order.
    pub fingerprint: String,
    pub config_hash: String,
    pub report: AlignmentReport,
    pub aligned_path: PathBuf,
    pub normalized_path: PathBuf,
}

/// Everything a run produced, in memory.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub alignment: Alignment,
    pub normalized: DataFrame,
    pub summary: RunSummary,
}

/// Align an already-parsed document.
pub fn align_document(doc: &Json, config: &PipelineConfig) -> Result<Alignment, RunError> {
    let input = build_input(doc, config)?;
    let alignment = AlignmentPipeline::new(config.pipeline_options()).run(input)?;
    for warning in &alignment.report.duplicate_keys {
        warn!("{warning}");
    }
    Ok(alignment)
}

/// Scale the aligned table with the configured exclusions.
pub fn normalize_table(table: &Table, config: &PipelineConfig) -> Result<DataFrame, RunError> {
    Ok(MinMaxScaler::new(config.normalize.exclude.iter().cloned()).fit_transform(table)?)
}

/// Full run: read the document, align, normalize, and write both CSVs.
pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput, RunError> {
    config.validate()?;
    let span = info_span!("run", symbol = %config.symbol);
    let _guard = span.enter();

    info!(input = %config.input.display(), "reading document");
    let doc = read_document(&config.input)?;
    let alignment = align_document(&doc, config)?;
    let normalized = normalize_table(&alignment.table, config)?;

    let aligned_path = config.aligned_path();
    let normalized_path = config.normalized_path();
    save_table(&alignment.table, &aligned_path)?;
    save_frame(&normalized, &normalized_path)?;

    let summary = RunSummary {
        symbol: config.symbol.clone(),
        rows: alignment.table.height(),
        columns: alignment.table.width(),
        normalized_columns: normalized.width(),
        fingerprint: alignment.table.content_hash(),
        config_hash: config.config_hash()?,
        report: alignment.report.clone(),
        aligned_path,
        normalized_path,
    };
    info!(fingerprint = %summary.fingerprint, "run complete");

    Ok(RunOutput {
        alignment,
        normalized,
        summary,
    })
}
