//! Fiscal quarters and their calendar intervals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quarterly reporting period label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FiscalPeriod {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl FiscalPeriod {
    pub const ALL: [FiscalPeriod; 4] = [
        FiscalPeriod::Q1,
        FiscalPeriod::Q2,
        FiscalPeriod::Q3,
        FiscalPeriod::Q4,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FiscalPeriod::Q1 => "Q1",
            FiscalPeriod::Q2 => "Q2",
            FiscalPeriod::Q3 => "Q3",
            FiscalPeriod::Q4 => "Q4",
        }
    }

    /// (first month, last month, last day of last month)
    fn months(&self) -> (u32, u32, u32) {
        match self {
            FiscalPeriod::Q1 => (1, 3, 31),
            FiscalPeriod::Q2 => (4, 6, 30),
            FiscalPeriod::Q3 => (7, 9, 30),
            FiscalPeriod::Q4 => (10, 12, 31),
        }
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a label is not one of `Q1`..`Q4`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized fiscal period label '{0}' (expected Q1, Q2, Q3 or Q4)")]
pub struct UnknownPeriod(pub String);

impl FromStr for FiscalPeriod {
    type Err = UnknownPeriod;

    /// Exact match only. `FY`, `q1` and friends are rejected rather than
    /// guessed at.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Q1" => Ok(FiscalPeriod::Q1),
            "Q2" => Ok(FiscalPeriod::Q2),
            "Q3" => Ok(FiscalPeriod::Q3),
            "Q4" => Ok(FiscalPeriod::Q4),
            other => Err(UnknownPeriod(other.to_string())),
        }
    }
}

/// Inclusive calendar range `[start, end]` covered by one fiscal quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuarterInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QuarterInterval {
    /// Interval for `period` of `year`. Returns `None` only when the year is
    /// outside chrono's representable range.
    pub fn new(year: i32, period: FiscalPeriod) -> Option<Self> {
        let (first, last, last_day) = period.months();
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, first, 1)?,
            end: NaiveDate::from_ymd_opt(year, last, last_day)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarter_bounds() {
        let q1 = QuarterInterval::new(2024, FiscalPeriod::Q1).unwrap();
        assert_eq!((q1.start, q1.end), (ymd(2024, 1, 1), ymd(2024, 3, 31)));
        let q4 = QuarterInterval::new(2024, FiscalPeriod::Q4).unwrap();
        assert_eq!((q4.start, q4.end), (ymd(2024, 10, 1), ymd(2024, 12, 31)));
    }

    #[test]
    fn quarters_tile_the_year() {
        let intervals: Vec<_> = FiscalPeriod::ALL
            .iter()
            .map(|p| QuarterInterval::new(2023, *p).unwrap())
            .collect();
        for pair in intervals.windows(2) {
            assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
        }
    }

    #[test]
    fn contains_is_inclusive() {
        let q2 = QuarterInterval::new(2023, FiscalPeriod::Q2).unwrap();
        assert!(q2.contains(ymd(2023, 4, 1)));
        assert!(q2.contains(ymd(2023, 6, 30)));
        assert!(!q2.contains(ymd(2023, 7, 1)));
        assert!(!q2.contains(ymd(2023, 3, 31)));
    }

    #[test]
    fn labels_parse_exactly() {
        assert_eq!("Q3".parse::<FiscalPeriod>().unwrap(), FiscalPeriod::Q3);
        assert!("FY".parse::<FiscalPeriod>().is_err());
        assert!("q1".parse::<FiscalPeriod>().is_err());
    }
}
