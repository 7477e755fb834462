//! Quarter interval mapping: (calendarYear, period) → [Start_Date, End_Date].

use crate::domain::{FiscalPeriod, QuarterInterval, Value};
use crate::error::AlignError;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const START_DATE: &str = "Start_Date";
pub const END_DATE: &str = "End_Date";

/// What to do with a fundamentals row whose period or year cannot be mapped
/// to a calendar quarter (annual `FY` rows, blanks, typos).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPeriodPolicy {
    /// Abort the run with `UnmappedPeriod` / `InvalidYear`.
    #[default]
    Fail,
    /// Remove the row, count it, and log a warning.
    Drop,
}

/// Map a year and a period label to its calendar interval.
///
/// Pure: the same input always yields the same interval.
pub fn quarter_interval(year: i32, label: &str) -> Result<QuarterInterval, AlignError> {
    let period: FiscalPeriod = label.parse().map_err(|_| AlignError::UnmappedPeriod {
        row: 0,
        label: label.to_string(),
    })?;
    QuarterInterval::new(year, period).ok_or_else(|| AlignError::InvalidYear {
        row: 0,
        value: year.to_string(),
    })
}

/// A fundamentals table with `Start_Date`/`End_Date` appended.
#[derive(Debug, Clone)]
pub struct StampedTable {
    pub table: Table,
    pub dropped: usize,
}

/// Append the quarter interval of every row as two date columns.
pub fn stamp_intervals(
    table: Table,
    year_column: &str,
    period_column: &str,
    policy: UnmappedPeriodPolicy,
) -> Result<StampedTable, AlignError> {
    let year_idx = table.require_column(year_column)?;
    let period_idx = table.require_column(period_column)?;
    for column in [START_DATE, END_DATE] {
        if table.has_column(column) {
            return Err(AlignError::DuplicateColumn {
                table: table.name().to_string(),
                column: column.to_string(),
            });
        }
    }

    let name = table.name().to_string();
    let mut columns = table.columns().to_vec();
    columns.push(START_DATE.to_string());
    columns.push(END_DATE.to_string());

    let mut rows = Vec::with_capacity(table.height());
    let mut dropped = 0;
    for (i, mut row) in table.into_rows().into_iter().enumerate() {
        match row_interval(i, &row[year_idx], &row[period_idx]) {
            Ok(interval) => {
                row.push(Value::Date(interval.start));
                row.push(Value::Date(interval.end));
                rows.push(row);
            }
            Err(e) if policy == UnmappedPeriodPolicy::Drop => {
                dropped += 1;
                debug!(error = %e, "dropping unmapped fundamentals row");
            }
            Err(e) => return Err(e),
        }
    }

    if dropped > 0 {
        warn!(table = %name, dropped, "dropped fundamentals rows with unmapped periods");
    }

    Ok(StampedTable {
        table: Table::from_rows(name, columns, rows)?,
        dropped,
    })
}

fn row_interval(row: usize, year: &Value, period: &Value) -> Result<QuarterInterval, AlignError> {
    let label = match period {
        Value::Text(s) => s.as_str(),
        other => {
            return Err(AlignError::UnmappedPeriod {
                row,
                label: other.to_string(),
            })
        }
    };
    let year = year.as_year().ok_or_else(|| AlignError::InvalidYear {
        row,
        value: year.to_string(),
    })?;
    quarter_interval(year, label).map_err(|e| match e {
        AlignError::UnmappedPeriod { label, .. } => AlignError::UnmappedPeriod { row, label },
        AlignError::InvalidYear { value, .. } => AlignError::InvalidYear { row, value },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fundamentals(rows: Vec<(Value, &str)>) -> Table {
        Table::from_rows(
            "fundamentals",
            vec!["calendarYear".into(), "period".into()],
            rows.into_iter()
                .map(|(y, p)| vec![y, Value::from(p)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn q2_2023_maps_to_april_through_june() {
        let iv = quarter_interval(2023, "Q2").unwrap();
        assert_eq!(iv.start, ymd(2023, 4, 1));
        assert_eq!(iv.end, ymd(2023, 6, 30));
        assert_eq!(quarter_interval(2023, "Q2").unwrap(), iv);
    }

    #[test]
    fn unknown_label_is_an_error_not_a_null() {
        let err = quarter_interval(2023, "FY").unwrap_err();
        assert!(err.is_unmapped_period());
    }

    #[test]
    fn stamping_appends_two_date_columns() {
        let t = fundamentals(vec![(Value::from("2023"), "Q3"), (Value::Number(2022.0), "Q4")]);

        let stamped = stamp_intervals(t, "calendarYear", "period", UnmappedPeriodPolicy::Fail).unwrap();

        let t = stamped.table;
        assert_eq!(t.columns(), &["calendarYear", "period", START_DATE, END_DATE]);
        assert_eq!(t.value(0, START_DATE), Some(&Value::Date(ymd(2023, 7, 1))));
        assert_eq!(t.value(1, END_DATE), Some(&Value::Date(ymd(2022, 12, 31))));
        assert_eq!(stamped.dropped, 0);
    }

    #[test]
    fn fail_policy_reports_the_row() {
        let t = fundamentals(vec![(Value::from("2023"), "Q1"), (Value::from("2023"), "FY")]);

        let err = stamp_intervals(t, "calendarYear", "period", UnmappedPeriodPolicy::Fail).unwrap_err();

        assert_eq!(
            err,
            AlignError::UnmappedPeriod {
                row: 1,
                label: "FY".into()
            }
        );
    }

    #[test]
    fn drop_policy_removes_and_counts() {
        let t = fundamentals(vec![
            (Value::from("2023"), "Q1"),
            (Value::from("2023"), "FY"),
            (Value::Null, "Q2"),
        ]);

        let stamped = stamp_intervals(t, "calendarYear", "period", UnmappedPeriodPolicy::Drop).unwrap();

        assert_eq!(stamped.table.height(), 1);
        assert_eq!(stamped.dropped, 2);
    }

    #[test]
    fn null_year_is_invalid() {
        let t = fundamentals(vec![(Value::Null, "Q2")]);
        let err = stamp_intervals(t, "calendarYear", "period", UnmappedPeriodPolicy::Fail).unwrap_err();
        assert!(matches!(err, AlignError::InvalidYear { row: 0, .. }));
    }
}
