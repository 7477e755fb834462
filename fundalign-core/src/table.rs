//! An immutable, row-oriented table snapshot with named columns.
//!
//! Every transform consumes or borrows a table and returns a new one; no
//! stage mutates a table it did not create.

use crate::domain::Value;
use crate::error::AlignError;
use std::collections::HashSet;

/// Ordered columns plus rows of cells. Column names are unique and every
/// row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Empty table with the given schema.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Result<Self, AlignError> {
        Self::from_rows(name, columns, Vec::new())
    }

    /// Build a table, checking column uniqueness and row width.
    pub fn from_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, AlignError> {
        let name = name.into();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(AlignError::DuplicateColumn {
                    table: name,
                    column: column.clone(),
                });
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AlignError::RaggedRow {
                    table: name,
                    row: i,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.rows
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Index of `column`, or a `MissingColumn` schema error naming this table.
    pub fn require_column(&self, column: &str) -> Result<usize, AlignError> {
        self.column_index(column)
            .ok_or_else(|| AlignError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, column: &str) -> Result<Vec<&Value>, AlignError> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Column-oriented view: `(name, cells)` in column order.
    ///
    /// This is the hand-off format for downstream consumers that want one
    /// fully materialised sequence per column.
    pub fn to_columns(&self) -> Vec<(String, Vec<Value>)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), self.rows.iter().map(|r| r[i].clone()).collect()))
            .collect()
    }

    // ── Schema transforms ───────────────────────────────────────────

    pub fn rename_column(mut self, from: &str, to: &str) -> Result<Self, AlignError> {
        let idx = self.require_column(from)?;
        if from != to && self.has_column(to) {
            return Err(AlignError::DuplicateColumn {
                table: self.name,
                column: to.to_string(),
            });
        }
        self.columns[idx] = to.to_string();
        Ok(self)
    }

    /// Append `_{suffix}` to every column not listed in `keep`.
    ///
    /// Used to disambiguate indicator columns that several lookback windows
    /// share (`rsi` → `rsi_tech5`, `rsi_tech20`).
    pub fn suffix_columns_except(self, suffix: &str, keep: &[&str]) -> Result<Self, AlignError> {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                if keep.contains(&c.as_str()) {
                    c.clone()
                } else {
                    format!("{c}_{suffix}")
                }
            })
            .collect();
        Self::from_rows(self.name, columns, self.rows)
    }

    /// Remove the named columns. Names that are not present are ignored.
    pub fn drop_columns(self, names: &[&str]) -> Self {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i].as_str()))
            .collect();
        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Self {
            name: self.name,
            columns,
            rows,
        }
    }

    /// Project onto `names`, in that order.
    pub fn select(&self, names: &[&str]) -> Result<Self, AlignError> {
        let idx = names
            .iter()
            .map(|n| self.require_column(n))
            .collect::<Result<Vec<_>, _>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| idx.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Self::from_rows(
            self.name.clone(),
            names.iter().map(|n| n.to_string()).collect(),
            rows,
        )
    }

    /// Append a column holding the same value on every row.
    pub fn with_constant_column(mut self, column: &str, value: Value) -> Result<Self, AlignError> {
        if self.has_column(column) {
            return Err(AlignError::DuplicateColumn {
                table: self.name,
                column: column.to_string(),
            });
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
        Ok(self)
    }

    /// Replace every cell of `column` with `f(cell)`.
    pub fn try_map_column<E, F>(mut self, column: &str, mut f: F) -> Result<Self, E>
    where
        E: From<AlignError>,
        F: FnMut(usize, Value) -> Result<Value, E>,
    {
        let idx = self.require_column(column)?;
        for (i, row) in self.rows.iter_mut().enumerate() {
            let cell = std::mem::take(&mut row[idx]);
            row[idx] = f(i, cell)?;
        }
        Ok(self)
    }

    // ── Row transforms ──────────────────────────────────────────────

    /// Stable ascending sort on one column (nulls first).
    pub fn sorted_by(mut self, column: &str) -> Result<Self, AlignError> {
        let idx = self.require_column(column)?;
        self.rows.sort_by(|a, b| a[idx].cmp(&b[idx]));
        Ok(self)
    }

    /// Keep rows for which `keep(index, row)` is true.
    pub fn filter_rows<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(usize, &[Value]) -> bool,
    {
        let mut i = 0;
        self.rows.retain(|row| {
            let k = keep(i, row);
            i += 1;
            k
        });
        self
    }

    /// Vertical concatenation. The result has this table's columns followed
    /// by any columns only `other` has; missing cells become `Null`.
    pub fn concat(self, other: Table) -> Self {
        let mut columns = self.columns;
        for c in &other.columns {
            if !columns.contains(c) {
                columns.push(c.clone());
            }
        }
        let width = columns.len();

        let mut rows = self.rows;
        for row in &mut rows {
            row.resize(width, Value::Null);
        }

        let mapping: Vec<usize> = other
            .columns
            .iter()
            .filter_map(|c| columns.iter().position(|x| x == c))
            .collect();
        for row in other.rows {
            let mut out = vec![Value::Null; width];
            for (cell, &target) in row.into_iter().zip(&mapping) {
                out[target] = cell;
            }
            rows.push(out);
        }

        Self {
            name: self.name,
            columns,
            rows,
        }
    }

    // ── Fingerprint ─────────────────────────────────────────────────

    /// BLAKE3 hash over the schema and the rows in canonical (sorted) order.
    ///
    /// Two tables with the same columns and the same multiset of rows hash
    /// identically regardless of row order.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.update(&[0x1e]);

        let mut rows: Vec<&Vec<Value>> = self.rows.iter().collect();
        rows.sort();
        for row in rows {
            for cell in row {
                hasher.update(&[cell.kind() as u8]);
                hasher.update(cell.to_string().as_bytes());
                hasher.update(&[0x1f]);
            }
            hasher.update(&[0x1e]);
        }

        hasher.finalize().to_hex().to_string()
    }
}
