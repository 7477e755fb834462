//! fundalign runner: configuration, document loading, normalization, export.
//!
//! This crate builds on `fundalign-core` to provide:
//! - `PipelineConfig` loaded from TOML, every field defaulted
//! - JSON document → per-topic `Table`s
//! - MinMax scaling of the aligned table into a polars `DataFrame`
//! - Atomic CSV export of both outputs
//! - Run fingerprinting for idempotence checks

pub mod config;
pub mod export;
pub mod loader;
pub mod normalize;
pub mod runner;

pub use config::{
    ConfigError, DisplayOptions, NormalizeConfig, OutputConfig, PipelineConfig, SectionConfig,
};
pub use export::{frame_to_csv, save_frame, save_table, table_to_csv, write_atomic, ExportError};
pub use loader::{build_input, load_input, read_document, records_to_table, section, LoadError};
pub use normalize::{ColumnRange, FittedScaler, MinMaxScaler, NormalizeError};
pub use runner::{align_document, normalize_table, run_pipeline, RunError, RunOutput, RunSummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<DisplayOptions>();
        assert_sync::<DisplayOptions>();
    }

    #[test]
    fn scaler_types_are_send_sync() {
        assert_send::<MinMaxScaler>();
        assert_sync::<MinMaxScaler>();
        assert_send::<FittedScaler>();
        assert_sync::<FittedScaler>();
    }

    #[test]
    fn run_summary_is_send_sync() {
        assert_send::<RunSummary>();
        assert_sync::<RunSummary>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
