//! JSON document → per-topic tables.
//!
//! The document is one JSON object. Each configured section resolves (by a
//! dotted path such as `historicalPriceFull.historical`) to an array of flat
//! records. Records become rows; the union of their field names, in the
//! order first seen, becomes the column list. A field absent from a record
//! is null in that row.

use chrono::{NaiveDate, NaiveDateTime};
use fundalign_core::{AlignError, PipelineInput, Table, TechnicalTable, Value};
use serde_json::{Map, Value as Json};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::config::PipelineConfig;

/// Column parsed as a calendar date in every table.
pub const DATE_FIELD: &str = "date";

/// Errors from reading and converting the input document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("section '{0}' not found in document")]
    MissingSection(String),

    #[error("section '{0}' is not an array of records")]
    NotAnArray(String),

    #[error("section '{section}' record {index} is not an object")]
    NotAnObject { section: String, index: usize },

    #[error("section '{section}' record {row}: unparsable date '{value}'")]
    InvalidDate {
        section: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Table(#[from] AlignError),
}

/// Read and parse the document at `path`.
pub fn read_document(path: &Path) -> Result<Json, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Resolve a dotted section path to its record array.
pub fn section<'a>(doc: &'a Json, path: &str) -> Result<&'a [Json], LoadError> {
    let mut node = doc;
    for part in path.split('.') {
        node = node
            .get(part)
            .ok_or_else(|| LoadError::MissingSection(path.to_string()))?;
    }
    node.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| LoadError::NotAnArray(path.to_string()))
}

/// Convert an array of flat records into a table named `name`.
pub fn records_to_table(name: &str, records: &[Json]) -> Result<Table, LoadError> {
    let objects = records
        .iter()
        .enumerate()
        .map(|(index, r)| {
            r.as_object().ok_or_else(|| LoadError::NotAnObject {
                section: name.to_string(),
                index,
            })
        })
        .collect::<Result<Vec<&Map<String, Json>>, _>>()?;

    let mut columns: Vec<String> = Vec::new();
    for object in &objects {
        for key in object.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(objects.len());
    for (row, object) in objects.iter().enumerate() {
        let mut cells = Vec::with_capacity(columns.len());
        for column in &columns {
            let cell = match object.get(column) {
                None => Value::Null,
                Some(json) if column == DATE_FIELD => parse_date_cell(name, row, json)?,
                Some(json) => json_to_value(json),
            };
            cells.push(cell);
        }
        rows.push(cells);
    }

    debug!(table = name, rows = rows.len(), columns = columns.len(), "loaded section");
    Ok(Table::from_rows(name, columns, rows)?)
}

/// Scalar JSON → cell. Nested arrays/objects are kept as their JSON text.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        Json::String(s) => Value::Text(s.clone()),
        nested => Value::Text(nested.to_string()),
    }
}

/// Parse `YYYY-MM-DD`, optionally followed by a time of day.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .ok()
}

fn parse_date_cell(section: &str, row: usize, json: &Json) -> Result<Value, LoadError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::String(s) => parse_date(s).map(Value::Date).ok_or_else(|| LoadError::InvalidDate {
            section: section.to_string(),
            row,
            value: s.clone(),
        }),
        other => Err(LoadError::InvalidDate {
            section: section.to_string(),
            row,
            value: other.to_string(),
        }),
    }
}

/// Build the pipeline input from a parsed document, using the section layout
/// in `config`.
pub fn build_input(doc: &Json, config: &PipelineConfig) -> Result<PipelineInput, LoadError> {
    let fundamentals = config
        .sections
        .fundamentals
        .iter()
        .map(|name| records_to_table(name, section(doc, name)?))
        .collect::<Result<Vec<_>, _>>()?;

    let technicals = config
        .sections
        .technicals
        .iter()
        .map(|window| {
            Ok(TechnicalTable {
                window: window.clone(),
                table: records_to_table(window, section(doc, window)?)?,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let price = records_to_table("historical", section(doc, &config.sections.price)?)?;

    Ok(PipelineInput {
        fundamentals,
        price,
        technicals,
    })
}

/// Read the configured input file and build the pipeline input.
pub fn load_input(config: &PipelineConfig) -> Result<PipelineInput, LoadError> {
    let doc = read_document(&config.input)?;
    build_input(&doc, config)
}
