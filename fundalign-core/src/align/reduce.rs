//! Table reduction: fold many tables into one by repeated full outer joins.

use crate::domain::{Value, ValueKind};
use crate::error::AlignError;
use crate::report::DuplicateKeyWarning;
use crate::table::Table;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Result of [`reduce_outer`]: the merged table plus any duplicate keys
/// found in the inputs.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub table: Table,
    pub duplicate_keys: Vec<DuplicateKeyWarning>,
}

/// Full outer join of `tables` on `keys`, applied left to right.
///
/// Input order only changes the column order of the result, never which
/// rows it contains. Every table must carry every key column.
pub fn reduce_outer(
    name: &str,
    tables: &[Table],
    keys: &[&str],
) -> Result<Reduction, AlignError> {
    let (first, rest) = tables.split_first().ok_or(AlignError::NoTables)?;

    // Validate every input up front so a missing key in the last table
    // fails before any join work.
    for table in tables {
        for key in keys {
            table.require_column(key)?;
        }
    }

    let mut duplicate_keys = Vec::new();
    for table in tables {
        duplicate_keys.extend(find_duplicate_keys(table, keys)?);
    }
    for dup in &duplicate_keys {
        warn!(table = %dup.table, key = %dup.key, rows = dup.occurrences, "duplicate join key");
    }

    let mut acc = first.clone();
    for table in rest {
        acc = outer_join(&acc, table, keys)?;
        debug!(
            merged = table.name(),
            rows = acc.height(),
            columns = acc.width(),
            "outer join step"
        );
    }

    Ok(Reduction {
        table: acc.with_name(name),
        duplicate_keys,
    })
}

/// Full outer join of two tables on `keys`.
///
/// Row order: each left row (expanded by its right matches, in right order),
/// then right rows that matched nothing. Key cells are coalesced into the
/// left table's key columns. Non-key columns present on both sides are
/// suffixed `_x` (left) and `_y` (right).
pub fn outer_join(left: &Table, right: &Table, keys: &[&str]) -> Result<Table, AlignError> {
    let left_keys = keys
        .iter()
        .map(|k| left.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;
    let right_keys = keys
        .iter()
        .map(|k| right.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;

    for (key, (&li, &ri)) in keys.iter().zip(left_keys.iter().zip(&right_keys)) {
        if let (Some(lk), Some(rk)) = (column_kind(left, li), column_kind(right, ri)) {
            if lk != rk {
                return Err(AlignError::IncompatibleKeyType {
                    column: key.to_string(),
                    left_table: left.name().to_string(),
                    left: lk,
                    right_table: right.name().to_string(),
                    right: rk,
                });
            }
        }
    }

    let right_rest: Vec<usize> = (0..right.width())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let is_key = |c: &str| keys.contains(&c);
    let right_rest_names: Vec<&str> = right_rest
        .iter()
        .map(|&i| right.columns()[i].as_str())
        .collect();

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|c| {
            if !is_key(c) && right_rest_names.contains(&c.as_str()) {
                format!("{c}_x")
            } else {
                c.clone()
            }
        })
        .collect();
    for name in &right_rest_names {
        if left.has_column(name) {
            columns.push(format!("{name}_y"));
        } else {
            columns.push(name.to_string());
        }
    }

    let mut index: HashMap<Vec<&Value>, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        let key: Vec<&Value> = right_keys.iter().map(|&k| &row[k]).collect();
        index.entry(key).or_default().push(i);
    }

    let mut used = vec![false; right.height()];
    let mut rows = Vec::with_capacity(left.height().max(right.height()));

    for lrow in left.rows() {
        let key: Vec<&Value> = left_keys.iter().map(|&k| &lrow[k]).collect();
        match index.get(&key) {
            Some(matches) => {
                for &ri in matches {
                    used[ri] = true;
                    let rrow = &right.rows()[ri];
                    let mut out = lrow.clone();
                    out.extend(right_rest.iter().map(|&c| rrow[c].clone()));
                    rows.push(out);
                }
            }
            None => {
                let mut out = lrow.clone();
                out.resize(columns.len(), Value::Null);
                rows.push(out);
            }
        }
    }

    for (ri, rrow) in right.rows().iter().enumerate() {
        if used[ri] {
            continue;
        }
        let mut out = vec![Value::Null; left.width()];
        for (&lk, &rk) in left_keys.iter().zip(&right_keys) {
            out[lk] = rrow[rk].clone();
        }
        out.extend(right_rest.iter().map(|&c| rrow[c].clone()));
        rows.push(out);
    }

    Table::from_rows(left.name(), columns, rows)
}

/// Keys that occur on more than one row of `table`.
pub fn find_duplicate_keys(
    table: &Table,
    keys: &[&str],
) -> Result<Vec<DuplicateKeyWarning>, AlignError> {
    let idx = keys
        .iter()
        .map(|k| table.require_column(k))
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts: BTreeMap<Vec<&Value>, usize> = BTreeMap::new();
    for row in table.rows() {
        *counts.entry(idx.iter().map(|&i| &row[i]).collect()).or_default() += 1;
    }

    Ok(counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(key, occurrences)| DuplicateKeyWarning {
            table: table.name().to_string(),
            key: keys
                .iter()
                .zip(key)
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", "),
            occurrences,
        })
        .collect())
}

/// Kind of the first non-null cell in a column.
fn column_kind(table: &Table, idx: usize) -> Option<ValueKind> {
    table
        .rows()
        .iter()
        .map(|r| &r[idx])
        .find(|v| !v.is_null())
        .map(Value::kind)
}
