//! The temporal alignment engine.
//!
//! Leaf-first:
//! - [`reduce`]: full outer join of many tables on shared keys
//! - [`quarter`]: fiscal quarter → calendar interval
//! - [`asof`]: backward as-of join plus interval masking
//! - [`recover`]: re-append quarters the as-of join never attached
//! - [`pipeline`]: orchestration and column bookkeeping

pub mod asof;
pub mod pipeline;
pub mod quarter;
pub mod recover;
pub mod reduce;

pub use asof::{AsofAligner, AsofOutput};
pub use pipeline::{
    Alignment, AlignmentPipeline, PipelineInput, PipelineOptions, TechnicalTable, DATE_INFO,
    DATE_PRICE, FUNDAMENTALS_KEYS, PRICE_KEYS, SYMBOL,
};
pub use quarter::{quarter_interval, stamp_intervals, UnmappedPeriodPolicy, END_DATE, START_DATE};
pub use recover::{RecoveryGranularity, Recovered, UnmatchedRecoverer};
pub use reduce::{find_duplicate_keys, outer_join, reduce_outer, Reduction};
