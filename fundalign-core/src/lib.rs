//! fundalign core: tables and the fundamentals/price alignment engine.
//!
//! This crate is pure and synchronous: it never touches the filesystem or
//! the network. It provides:
//! - [`Table`], an immutable row-oriented snapshot with typed cells
//! - Multi-table outer-join reduction on shared keys
//! - Fiscal quarter → calendar interval mapping
//! - Backward as-of join with interval-validity masking
//! - Recovery of quarters that never matched a trading day
//! - [`AlignmentPipeline`], which runs all of the above for one symbol

pub mod align;
pub mod domain;
pub mod error;
pub mod report;
pub mod table;

pub use align::{Alignment, AlignmentPipeline, PipelineInput, PipelineOptions, TechnicalTable};
pub use domain::{ColumnGroup, FiscalPeriod, QuarterInterval, Value, ValueKind};
pub use error::AlignError;
pub use report::{AlignmentReport, DuplicateKeyWarning};
pub use table::Table;
