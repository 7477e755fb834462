//! Domain types: cell values, fiscal periods, quarter intervals, column groups.

pub mod column_group;
pub mod period;
pub mod value;

pub use column_group::ColumnGroup;
pub use period::{FiscalPeriod, QuarterInterval, UnknownPeriod};
pub use value::{Value, ValueKind};
