//! Backward as-of join with interval-validity masking.
//!
//! For every daily row with date `d`, the fundamentals row with the greatest
//! start date `<= d` is attached (last one wins on ties). If `d` then falls
//! outside that row's `[start, end]` interval, the whole payload is nulled:
//! the nearest preceding quarter has already closed and no newer quarter has
//! started yet.
//!
//! Both inputs must already be sorted ascending on their join columns; the
//! aligner verifies this and refuses unsorted input instead of silently
//! producing an arbitrary correspondence.

use crate::domain::{ColumnGroup, QuarterInterval, Value};
use crate::error::AlignError;
use crate::table::Table;
use chrono::NaiveDate;
use tracing::debug;

/// Column names the aligner joins and masks on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsofAligner {
    /// Date column of the daily (driving) table.
    pub date_column: String,
    /// Interval start column of the fundamentals table; the join key.
    pub start_column: String,
    /// Interval end column of the fundamentals table; used by the mask.
    pub end_column: String,
}

/// Aligned table plus how each daily row fared.
#[derive(Debug, Clone)]
pub struct AsofOutput {
    pub table: Table,
    pub matched: usize,
    pub masked: usize,
    pub unmatched: usize,
}

impl AsofAligner {
    pub fn new(
        date_column: impl Into<String>,
        start_column: impl Into<String>,
        end_column: impl Into<String>,
    ) -> Self {
        Self {
            date_column: date_column.into(),
            start_column: start_column.into(),
            end_column: end_column.into(),
        }
    }

    /// Attach `payload` columns of `fundamentals` to every row of `daily`.
    ///
    /// The output has exactly one row per daily row, in daily order, with the
    /// daily columns followed by the payload columns.
    pub fn align(
        &self,
        daily: &Table,
        fundamentals: &Table,
        payload: &ColumnGroup,
    ) -> Result<AsofOutput, AlignError> {
        let dates = date_key(daily, &self.date_column)?;
        let starts = date_key(fundamentals, &self.start_column)?;
        let ends = date_cells(fundamentals, &self.end_column)?;

        let payload_idx = payload
            .columns
            .iter()
            .map(|c| {
                if daily.has_column(c) {
                    return Err(AlignError::DuplicateColumn {
                        table: daily.name().to_string(),
                        column: c.clone(),
                    });
                }
                fundamentals.require_column(c)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns = daily.columns().to_vec();
        columns.extend(payload.columns.iter().cloned());

        let mut matched = 0;
        let mut masked = 0;
        let mut unmatched = 0;
        let mut rows = Vec::with_capacity(daily.height());

        for (drow, &d) in daily.rows().iter().zip(&dates) {
            let mut out = drow.clone();
            // Index one past the last start <= d.
            let upper = starts.partition_point(|s| *s <= d);
            match upper.checked_sub(1) {
                None => {
                    unmatched += 1;
                    out.extend(std::iter::repeat(Value::Null).take(payload_idx.len()));
                }
                Some(j) => {
                    let interval = QuarterInterval {
                        start: starts[j],
                        end: ends[j],
                    };
                    if interval.contains(d) {
                        matched += 1;
                        let frow = &fundamentals.rows()[j];
                        out.extend(payload_idx.iter().map(|&c| frow[c].clone()));
                    } else {
                        masked += 1;
                        out.extend(std::iter::repeat(Value::Null).take(payload_idx.len()));
                    }
                }
            }
            rows.push(out);
        }

        debug!(
            rows = rows.len(),
            matched, masked, unmatched, "as-of alignment complete"
        );

        Ok(AsofOutput {
            table: Table::from_rows(daily.name(), columns, rows)?,
            matched,
            masked,
            unmatched,
        })
    }
}

/// Non-null dates of a join column, verified ascending.
fn date_key(table: &Table, column: &str) -> Result<Vec<NaiveDate>, AlignError> {
    let dates = date_cells(table, column)?;
    if let Some(i) = dates.windows(2).position(|w| w[0] > w[1]) {
        return Err(AlignError::Unsorted {
            table: table.name().to_string(),
            column: column.to_string(),
            prev: i,
            row: i + 1,
        });
    }
    Ok(dates)
}

fn date_cells(table: &Table, column: &str) -> Result<Vec<NaiveDate>, AlignError> {
    let idx = table.require_column(column)?;
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row[idx].as_date().ok_or_else(|| AlignError::NullKey {
                table: table.name().to_string(),
                column: column.to_string(),
                row: i,
            })
        })
        .collect()
}
