//! CSV persistence for the aligned table and the normalized frame.
//!
//! Both files are comma-delimited with a header row. Nulls are empty
//! fields, dates are `YYYY-MM-DD`, numbers are written in shortest
//! round-trip form. Writes are atomic: write to `.tmp`, then rename over the
//! destination.

use std::fs;
use std::path::{Path, PathBuf};

use fundalign_core::Table;
use polars::prelude::{DataFrame, PolarsError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frame column '{column}' is not Float64: {source}")]
    Frame {
        column: String,
        #[source]
        source: PolarsError,
    },
}

/// Render a table as CSV text.
pub fn table_to_csv(table: &Table) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    finish(wtr)
}

/// Render a Float64 frame as CSV text.
pub fn frame_to_csv(df: &DataFrame) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(df.get_column_names().iter().map(|n| n.as_str()))?;

    let columns = df
        .get_columns()
        .iter()
        .map(|c| {
            c.f64().map_err(|source| ExportError::Frame {
                column: c.name().to_string(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for i in 0..df.height() {
        wtr.write_record(
            columns
                .iter()
                .map(|ca| ca.get(i).map(|x| x.to_string()).unwrap_or_default()),
        )?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(data).map_err(|e| {
        ExportError::Csv(csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        )))
    })
}

/// Write `content` to `path`, replacing any existing file atomically.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(e)
    })
}

pub fn save_table(table: &Table, path: &Path) -> Result<(), ExportError> {
    write_atomic(path, &table_to_csv(table)?)?;
    info!(path = %path.display(), rows = table.height(), "wrote aligned table");
    Ok(())
}

pub fn save_frame(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    write_atomic(path, &frame_to_csv(df)?)?;
    info!(path = %path.display(), rows = df.height(), "wrote normalized frame");
    Ok(())
}
