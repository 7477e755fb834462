//! Error types for the alignment engine.
//!
//! Every variant is fatal for the current run. Non-fatal conditions
//! (duplicate keys, dropped rows) are collected in
//! [`AlignmentReport`](crate::report::AlignmentReport) instead.

use crate::domain::ValueKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    // ── Schema ──────────────────────────────────────────────────────
    #[error("schema error: table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error(
        "schema error: key column '{column}' is {left} in '{left_table}' but {right} in '{right_table}'"
    )]
    IncompatibleKeyType {
        column: String,
        left_table: String,
        left: ValueKind,
        right_table: String,
        right: ValueKind,
    },

    #[error("schema error: column '{column}' would appear twice in '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("schema error: key column '{column}' of '{table}' is null or not a date at row {row}")]
    NullKey {
        table: String,
        column: String,
        row: usize,
    },

    #[error("schema error: row {row} of '{table}' has {actual} cells, expected {expected}")]
    RaggedRow {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("schema error: no tables to reduce")]
    NoTables,

    // ── Ordering ────────────────────────────────────────────────────
    #[error("ordering error: '{table}' is not sorted ascending by '{column}' (row {row} precedes row {prev})")]
    Unsorted {
        table: String,
        column: String,
        prev: usize,
        row: usize,
    },

    // ── Periods ─────────────────────────────────────────────────────
    #[error("unmapped period: row {row} has period '{label}' (expected Q1, Q2, Q3 or Q4)")]
    UnmappedPeriod { row: usize, label: String },

    #[error("invalid calendar year at row {row}: '{value}'")]
    InvalidYear { row: usize, value: String },
}

impl AlignError {
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            AlignError::MissingColumn { .. }
                | AlignError::IncompatibleKeyType { .. }
                | AlignError::DuplicateColumn { .. }
                | AlignError::NullKey { .. }
                | AlignError::RaggedRow { .. }
                | AlignError::NoTables
        )
    }

    pub fn is_ordering_error(&self) -> bool {
        matches!(self, AlignError::Unsorted { .. })
    }

    /// Errors that [`UnmappedPeriodPolicy::Drop`](crate::align::UnmappedPeriodPolicy)
    /// turns into dropped rows.
    pub fn is_unmapped_period(&self) -> bool {
        matches!(
            self,
            AlignError::UnmappedPeriod { .. } | AlignError::InvalidYear { .. }
        )
    }
}
