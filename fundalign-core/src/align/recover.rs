//! Recovery of fundamentals rows the as-of join never attached.
//!
//! The backward join hands each quarter only to the trading days that fall
//! inside it. A quarter with no trading day at all (gaps in the price feed,
//! a filing for a quarter before the price history starts) never shows up
//! in the aligned table. Those rows are appended here as standalone rows
//! with every price column null.

use crate::domain::Value;
use crate::error::AlignError;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Unit of the "already present?" check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryGranularity {
    /// Compare interval start dates. Records sharing a start date are
    /// recovered together or not at all.
    #[default]
    StartDate,
    /// Compare the record identity key columns.
    IdentityKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedRecoverer {
    pub granularity: RecoveryGranularity,
    pub start_column: String,
    /// Columns compared under [`RecoveryGranularity::IdentityKey`]. They must
    /// exist in both the aligned and the fundamentals table.
    pub identity_key: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Recovered {
    pub table: Table,
    pub recovered: usize,
}

impl UnmatchedRecoverer {
    pub fn new(
        granularity: RecoveryGranularity,
        start_column: impl Into<String>,
        identity_key: Vec<String>,
    ) -> Self {
        Self {
            granularity,
            start_column: start_column.into(),
            identity_key,
        }
    }

    fn key_columns(&self) -> Vec<&str> {
        match self.granularity {
            RecoveryGranularity::StartDate => vec![self.start_column.as_str()],
            RecoveryGranularity::IdentityKey => {
                self.identity_key.iter().map(String::as_str).collect()
            }
        }
    }

    /// Append every fundamentals row whose key is absent from `aligned`.
    ///
    /// Rows masked by the as-of join carry a null key and never count as
    /// present.
    pub fn recover(&self, aligned: Table, fundamentals: &Table) -> Result<Recovered, AlignError> {
        let keys = self.key_columns();
        let aligned_idx = keys
            .iter()
            .map(|k| aligned.require_column(k))
            .collect::<Result<Vec<_>, _>>()?;
        let fund_idx = keys
            .iter()
            .map(|k| fundamentals.require_column(k))
            .collect::<Result<Vec<_>, _>>()?;

        let present: BTreeSet<Vec<&Value>> = aligned
            .rows()
            .iter()
            .map(|row| aligned_idx.iter().map(|&i| &row[i]).collect::<Vec<_>>())
            .filter(|key| key.iter().any(|v| !v.is_null()))
            .collect();

        let missing: Vec<bool> = fundamentals
            .rows()
            .iter()
            .map(|row| {
                let key: Vec<&Value> = fund_idx.iter().map(|&i| &row[i]).collect();
                !present.contains(&key)
            })
            .collect();
        let orphans = fundamentals.clone().filter_rows(|i, _| missing[i]);
        let recovered = orphans.height();

        debug!(
            recovered,
            granularity = ?self.granularity,
            "recovered unmatched fundamentals rows"
        );

        Ok(Recovered {
            table: aligned.concat(orphans),
            recovered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    fn fundamentals() -> Table {
        Table::from_rows(
            "fundamentals",
            vec!["period".into(), "metricX".into(), "Start_Date".into()],
            vec![
                vec![Value::from("Q2"), Value::Number(1.0), d(2023, 4, 1)],
                vec![Value::from("Q3"), Value::Number(2.0), d(2023, 7, 1)],
            ],
        )
        .unwrap()
    }

    fn aligned() -> Table {
        Table::from_rows(
            "aligned",
            vec![
                "date_price".into(),
                "close".into(),
                "period".into(),
                "metricX".into(),
                "Start_Date".into(),
            ],
            vec![
                vec![d(2023, 4, 5), Value::Number(9.0), Value::from("Q2"), Value::Number(1.0), d(2023, 4, 1)],
                vec![d(2023, 10, 2), Value::Number(9.5), Value::Null, Value::Null, Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn appends_quarter_without_trading_days() {
        let r = UnmatchedRecoverer::new(RecoveryGranularity::StartDate, "Start_Date", vec![]);

        let out = r.recover(aligned(), &fundamentals()).unwrap();

        assert_eq!(out.recovered, 1);
        assert_eq!(out.table.height(), 3);
        assert_eq!(out.table.value(2, "period"), Some(&Value::from("Q3")));
        assert!(out.table.value(2, "date_price").unwrap().is_null());
        assert!(out.table.value(2, "close").unwrap().is_null());
    }

    #[test]
    fn identity_key_granularity_agrees_when_keys_are_unique() {
        let coarse = UnmatchedRecoverer::new(RecoveryGranularity::StartDate, "Start_Date", vec![]);
        let fine = UnmatchedRecoverer::new(
            RecoveryGranularity::IdentityKey,
            "Start_Date",
            vec!["period".into()],
        );

        let a = coarse.recover(aligned(), &fundamentals()).unwrap();
        let b = fine.recover(aligned(), &fundamentals()).unwrap();

        assert_eq!(a.table, b.table);
    }

    #[test]
    fn nothing_to_recover_leaves_table_unchanged() {
        let fund = fundamentals().filter_rows(|i, _| i == 0);
        let r = UnmatchedRecoverer::new(RecoveryGranularity::StartDate, "Start_Date", vec![]);

        let out = r.recover(aligned(), &fund).unwrap();

        assert_eq!(out.recovered, 0);
        assert_eq!(out.table, aligned());
    }
}
