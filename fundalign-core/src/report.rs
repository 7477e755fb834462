//! Per-run counters and non-fatal warnings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Two or more rows of one input table share a full identity key.
///
/// Not fatal: the outer join still runs, but the result for that key is a
/// cartesian product of the duplicates and should not be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKeyWarning {
    pub table: String,
    /// Key rendered as `col=value` pairs.
    pub key: String,
    pub occurrences: usize,
}

impl fmt::Display for DuplicateKeyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duplicate key in '{}': {} ({} rows)",
            self.table, self.key, self.occurrences
        )
    }
}

/// Summary of one alignment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentReport {
    /// Rows in the merged daily table (= aligned rows carrying price data).
    pub price_rows: usize,
    /// Rows in the merged fundamentals table after period mapping.
    pub fundamentals_rows: usize,
    /// Daily rows whose attachment survived the interval mask.
    pub matched_rows: usize,
    /// Daily rows whose attachment was nulled by the interval mask.
    pub masked_rows: usize,
    /// Daily rows with no fundamentals record starting on or before them.
    pub unmatched_rows: usize,
    /// Fundamentals rows appended as standalone rows.
    pub recovered_rows: usize,
    /// Fundamentals rows removed because their period could not be mapped.
    pub dropped_rows: usize,
    /// Fundamentals rows whose symbol differs from the run symbol.
    pub foreign_symbol_rows: usize,
    pub duplicate_keys: Vec<DuplicateKeyWarning>,
}

impl AlignmentReport {
    /// Total rows in the final table.
    pub fn total_rows(&self) -> usize {
        self.price_rows + self.recovered_rows
    }

    pub fn has_warnings(&self) -> bool {
        !self.duplicate_keys.is_empty() || self.dropped_rows > 0 || self.foreign_symbol_rows > 0
    }
}
