//! Named column sets passed between pipeline stages.

use serde::{Deserialize, Serialize};

/// An explicit list of columns owned by one side of a join.
///
/// The as-of aligner nulls exactly the columns of the fundamentals group
/// when an attachment falls outside its quarter. The group is carried from
/// the reduction step rather than re-derived from the joined schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnGroup {
    pub name: String,
    pub columns: Vec<String>,
}

impl ColumnGroup {
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Copy of this group without `excluded` columns.
    pub fn without(&self, excluded: &[&str]) -> Self {
        Self {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| !excluded.contains(&c.as_str()))
                .cloned()
                .collect(),
        }
    }
}
