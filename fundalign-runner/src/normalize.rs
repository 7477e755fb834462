//! MinMax feature scaling over the aligned table.
//!
//! Identifier columns are excluded by name; of the rest, only columns whose
//! non-null cells are all numbers are kept. `fit` learns each column's
//! range over the whole table and `transform` maps `x → (x − min) / (max − min)`.
//! Nulls stay null, and a constant column maps to 0.

use fundalign_core::{Table, Value};
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no numeric columns left to scale")]
    NoNumericColumns,

    #[error("column '{0}' was fitted but is missing or no longer numeric")]
    ColumnMismatch(String),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Learned range of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRange {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

/// Unfitted scaler: knows only which columns to leave alone.
#[derive(Debug, Clone, Default)]
pub struct MinMaxScaler {
    exclude: Vec<String>,
}

/// Scaler with per-column ranges, ready to transform.
#[derive(Debug, Clone)]
pub struct FittedScaler {
    ranges: Vec<ColumnRange>,
}

impl MinMaxScaler {
    pub fn new(exclude: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Columns eligible for scaling: not excluded, at least one number, and
    /// no text or date cells.
    pub fn numeric_columns(&self, table: &Table) -> Vec<String> {
        table
            .to_columns()
            .into_iter()
            .filter(|(name, _)| !self.exclude.iter().any(|e| e == name))
            .filter(|(_, cells)| {
                cells.iter().all(|v| v.is_null() || v.as_number().is_some())
                    && cells.iter().any(|v| v.as_number().is_some())
            })
            .map(|(name, _)| name)
            .collect()
    }

    /// Learn min/max of every eligible column.
    pub fn fit(&self, table: &Table) -> Result<FittedScaler, NormalizeError> {
        let columns = self.numeric_columns(table);
        if columns.is_empty() {
            return Err(NormalizeError::NoNumericColumns);
        }
        let df = numeric_frame(table, &columns)?;

        let mut ranges = Vec::with_capacity(columns.len());
        for name in columns {
            let ca = df.column(&name)?.f64()?;
            match (ca.min(), ca.max()) {
                (Some(min), Some(max)) => ranges.push(ColumnRange { column: name, min, max }),
                _ => return Err(NormalizeError::ColumnMismatch(name)),
            }
        }

        debug!(columns = ranges.len(), "fitted min-max scaler");
        Ok(FittedScaler { ranges })
    }

    pub fn fit_transform(&self, table: &Table) -> Result<DataFrame, NormalizeError> {
        self.fit(table)?.transform(table)
    }
}

impl FittedScaler {
    pub fn ranges(&self) -> &[ColumnRange] {
        &self.ranges
    }

    /// Scale the fitted columns of `table` into a new frame.
    pub fn transform(&self, table: &Table) -> Result<DataFrame, NormalizeError> {
        let names: Vec<String> = self.ranges.iter().map(|r| r.column.clone()).collect();
        let df = numeric_frame(table, &names)?;

        let exprs: Vec<Expr> = self
            .ranges
            .iter()
            .map(|r| {
                let span = r.max - r.min;
                let scaled = if span > 0.0 {
                    (col(r.column.as_str()) - lit(r.min)) / lit(span)
                } else {
                    // Constant column: 0 everywhere, nulls preserved.
                    col(r.column.as_str()) * lit(0.0)
                };
                scaled.alias(r.column.as_str())
            })
            .collect();

        Ok(df.lazy().select(exprs).collect()?)
    }
}

/// Materialise `columns` of `table` as a Float64 frame.
pub fn numeric_frame(table: &Table, columns: &[String]) -> Result<DataFrame, NormalizeError> {
    let series = columns
        .iter()
        .map(|name| {
            let cells = table
                .column(name)
                .map_err(|_| NormalizeError::ColumnMismatch(name.clone()))?;
            let values = cells
                .into_iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Number(x) => Ok(Some(*x)),
                    _ => Err(NormalizeError::ColumnMismatch(name.clone())),
                })
                .collect::<Result<Vec<Option<f64>>, _>>()?;
            Ok(Column::new(name.as_str().into(), values))
        })
        .collect::<Result<Vec<Column>, NormalizeError>>()?;

    Ok(DataFrame::new(series)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_rows(
            "aligned",
            vec![
                "date_price".into(),
                "symbol".into(),
                "close".into(),
                "flat".into(),
                "period".into(),
                "pe".into(),
            ],
            vec![
                vec![
                    Value::from("2023-01-03"),
                    Value::from("X"),
                    Value::Number(10.0),
                    Value::Number(7.0),
                    Value::from("Q1"),
                    Value::Null,
                ],
                vec![
                    Value::from("2023-01-04"),
                    Value::from("X"),
                    Value::Number(20.0),
                    Value::Number(7.0),
                    Value::from("Q1"),
                    Value::Number(4.0),
                ],
                vec![
                    Value::from("2023-01-05"),
                    Value::from("X"),
                    Value::Number(15.0),
                    Value::Null,
                    Value::Null,
                    Value::Number(2.0),
                ],
            ],
        )
        .unwrap()
    }

    fn scaler() -> MinMaxScaler {
        MinMaxScaler::new(["symbol", "date_price"])
    }

    #[test]
    fn only_numeric_non_excluded_columns_are_kept() {
        assert_eq!(scaler().numeric_columns(&table()), ["close", "flat", "pe"]);
    }

    #[test]
    fn fit_learns_ranges() {
        let fitted = scaler().fit(&table()).unwrap();
        assert_eq!(
            fitted.ranges()[0],
            ColumnRange {
                column: "close".into(),
                min: 10.0,
                max: 20.0
            }
        );
        assert_eq!(fitted.ranges()[2].min, 2.0);
    }

    #[test]
    fn transform_scales_into_unit_interval() {
        let df = scaler().fit_transform(&table()).unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(df.height(), 3);

        let close = df.column("close").unwrap().f64().unwrap();
        assert_eq!(close.get(0), Some(0.0));
        assert_eq!(close.get(1), Some(1.0));
        assert_eq!(close.get(2), Some(0.5));
    }

    #[test]
    fn constant_column_maps_to_zero_and_nulls_survive() {
        let df = scaler().fit_transform(&table()).unwrap();

        let flat = df.column("flat").unwrap().f64().unwrap();
        assert_eq!(flat.get(0), Some(0.0));
        assert_eq!(flat.get(1), Some(0.0));
        assert_eq!(flat.get(2), None);

        let pe = df.column("pe").unwrap().f64().unwrap();
        assert_eq!(pe.get(0), None);
        assert_eq!(pe.get(1), Some(1.0));
        assert_eq!(pe.get(2), Some(0.0));
    }

    #[test]
    fn all_text_table_has_nothing_to_scale() {
        let t = Table::from_rows(
            "t",
            vec!["symbol".into(), "period".into()],
            vec![vec![Value::from("X"), Value::from("Q1")]],
        )
        .unwrap();
        assert!(matches!(
            scaler().fit(&t),
            Err(NormalizeError::NoNumericColumns)
        ));
    }

    #[test]
    fn transform_rejects_table_missing_a_fitted_column() {
        let fitted = scaler().fit(&table()).unwrap();
        let narrower = table().drop_columns(&["pe"]);
        assert!(matches!(
            fitted.transform(&narrower),
            Err(NormalizeError::ColumnMismatch(ref c)) if c == "pe"
        ));
    }
}
