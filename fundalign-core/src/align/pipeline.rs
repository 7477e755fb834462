//! Alignment pipeline: reduce → stamp intervals → sort → as-of → recover.

use super::asof::AsofAligner;
use super::quarter::{stamp_intervals, UnmappedPeriodPolicy, END_DATE, START_DATE};
use super::recover::{RecoveryGranularity, UnmatchedRecoverer};
use super::reduce::{find_duplicate_keys, reduce_outer};
use crate::domain::{ColumnGroup, Value};
use crate::error::AlignError;
use crate::report::AlignmentReport;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DATE: &str = "date";
pub const DATE_INFO: &str = "date_info";
pub const DATE_PRICE: &str = "date_price";
pub const SYMBOL: &str = "symbol";
pub const CALENDAR_YEAR: &str = "calendarYear";
pub const PERIOD: &str = "period";

/// Join keys shared by every quarterly topic.
pub const FUNDAMENTALS_KEYS: [&str; 4] = [DATE, SYMBOL, CALENDAR_YEAR, PERIOD];

/// Join keys shared by the price table and every technical-indicator window.
pub const PRICE_KEYS: [&str; 6] = [DATE, "open", "high", "low", "close", "volume"];

/// Run-level switches. The symbol is supplied by the caller because the
/// daily price records do not carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub symbol: String,
    #[serde(default)]
    pub unmapped_periods: UnmappedPeriodPolicy,
    #[serde(default)]
    pub recovery: RecoveryGranularity,
}

impl PipelineOptions {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            unmapped_periods: UnmappedPeriodPolicy::default(),
            recovery: RecoveryGranularity::default(),
        }
    }
}

/// Technical-indicator table for one lookback window (`tech5`, `tech20`, ...).
#[derive(Debug, Clone)]
pub struct TechnicalTable {
    pub window: String,
    pub table: Table,
}

/// Raw per-topic tables for one symbol.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Quarterly topics, merged in this order.
    pub fundamentals: Vec<Table>,
    /// Daily OHLCV history.
    pub price: Table,
    /// Indicator windows, merged after `price` in this order.
    pub technicals: Vec<TechnicalTable>,
}

/// Final aligned table and what happened while building it.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub table: Table,
    pub report: AlignmentReport,
    /// Columns contributed by the fundamentals side (without the interval
    /// bookkeeping columns).
    pub fundamentals_columns: ColumnGroup,
}

#[derive(Debug, Clone)]
pub struct AlignmentPipeline {
    options: PipelineOptions,
}

impl AlignmentPipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Merge the fundamentals topics on their shared keys.
    pub fn merge_fundamentals(&self, tables: &[Table]) -> Result<(Table, AlignmentReport), AlignError> {
        let reduction = reduce_outer("fundamentals", tables, &FUNDAMENTALS_KEYS)?;
        let mut report = AlignmentReport {
            duplicate_keys: reduction.duplicate_keys,
            ..Default::default()
        };
        // Same quarter filed under two dates survives the join as two rows.
        report.duplicate_keys.extend(find_duplicate_keys(
            &reduction.table,
            &[SYMBOL, CALENDAR_YEAR, PERIOD],
        )?);
        Ok((reduction.table, report))
    }

    /// Suffix each indicator window's columns and merge everything with the
    /// price history on the OHLCV keys.
    pub fn merge_prices(
        &self,
        price: Table,
        technicals: Vec<TechnicalTable>,
    ) -> Result<(Table, AlignmentReport), AlignError> {
        let price = if price.has_column(SYMBOL) {
            price
        } else {
            price.with_constant_column(SYMBOL, Value::from(self.options.symbol.as_str()))?
        };

        let mut tables = Vec::with_capacity(technicals.len() + 1);
        tables.push(price);
        for tech in technicals {
            tables.push(tech.table.suffix_columns_except(&tech.window, &PRICE_KEYS)?);
        }

        let reduction = reduce_outer("price", &tables, &PRICE_KEYS)?;
        let mut report = AlignmentReport {
            duplicate_keys: reduction.duplicate_keys,
            ..Default::default()
        };
        // The OHLCV key is wider than the identity key: two windows that
        // disagree on a close price produce two rows for one date.
        report
            .duplicate_keys
            .extend(find_duplicate_keys(&reduction.table, &[DATE])?);
        Ok((reduction.table, report))
    }

    /// Run the whole pipeline.
    pub fn run(&self, input: PipelineInput) -> Result<Alignment, AlignError> {
        let (fundamentals, fund_report) = self.merge_fundamentals(&input.fundamentals)?;
        let (price, price_report) = self.merge_prices(input.price, input.technicals)?;

        let fundamentals = fundamentals.rename_column(DATE, DATE_INFO)?;
        let price = price.rename_column(DATE, DATE_PRICE)?;

        let stamped = stamp_intervals(
            fundamentals,
            CALENDAR_YEAR,
            PERIOD,
            self.options.unmapped_periods,
        )?;

        let price = price.sorted_by(DATE_PRICE)?;
        let fundamentals = stamped.table.sorted_by(START_DATE)?;

        let foreign_symbol_rows = fundamentals
            .column(SYMBOL)?
            .into_iter()
            .filter(|v| !v.is_null() && v.as_text() != Some(self.options.symbol.as_str()))
            .count();
        if foreign_symbol_rows > 0 {
            warn!(
                symbol = %self.options.symbol,
                rows = foreign_symbol_rows,
                "fundamentals rows carry a different symbol"
            );
        }

        let payload = ColumnGroup::new(
            "fundamentals",
            fundamentals.columns().iter().filter(|c| c.as_str() != SYMBOL).cloned(),
        );

        let aligned = AsofAligner::new(DATE_PRICE, START_DATE, END_DATE).align(
            &price,
            &fundamentals,
            &payload,
        )?;

        let recovered = UnmatchedRecoverer::new(
            self.options.recovery,
            START_DATE,
            vec![CALENDAR_YEAR.to_string(), PERIOD.to_string()],
        )
        .recover(aligned.table, &fundamentals)?;

        let table = recovered
            .table
            .drop_columns(&[START_DATE, END_DATE])
            .with_name("aligned");

        let mut duplicate_keys = fund_report.duplicate_keys;
        duplicate_keys.extend(price_report.duplicate_keys);

        let report = AlignmentReport {
            price_rows: price.height(),
            fundamentals_rows: fundamentals.height(),
            matched_rows: aligned.matched,
            masked_rows: aligned.masked,
            unmatched_rows: aligned.unmatched,
            recovered_rows: recovered.recovered,
            dropped_rows: stamped.dropped,
            foreign_symbol_rows,
            duplicate_keys,
        };

        info!(
            symbol = %self.options.symbol,
            rows = table.height(),
            columns = table.width(),
            matched = report.matched_rows,
            masked = report.masked_rows,
            recovered = report.recovered_rows,
            "alignment complete"
        );

        Ok(Alignment {
            table,
            report,
            fundamentals_columns: payload.without(&[START_DATE, END_DATE]),
        })
    }
}
