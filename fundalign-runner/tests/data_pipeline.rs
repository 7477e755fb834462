//! End-to-end runs: JSON document on disk → aligned and normalized CSVs.

use std::fs;
use std::path::Path;

use fundalign_core::align::UnmappedPeriodPolicy;
use fundalign_runner::{align_document, run_pipeline, PipelineConfig, RunError};
use proptest::prelude::*;
use serde_json::{json, Value as Json};

// ── Fixtures ─────────────────────────────────────────────────────────

const TOPICS: [&str; 5] = [
    "balanceSheetStatementGrowth",
    "cashFlowStatementGrowth",
    "incomeStatementGrowth",
    "financialGrowth",
    "ratios",
];
const WINDOWS: [&str; 4] = ["tech5", "tech20", "tech60", "tech252"];

fn quarter_record(topic_idx: usize, date: &str, year: &str, period: &str, v: f64) -> Json {
    let mut record = json!({
        "date": date,
        "symbol": "1101.TW",
        "calendarYear": year,
        "period": period,
    });
    record[format!("metric{topic_idx}")] = json!(v);
    record
}

fn ohlcv(date: &str, close: f64) -> Json {
    json!({
        "date": date,
        "open": close - 0.5,
        "high": close + 1.0,
        "low": close - 1.0,
        "close": close,
        "volume": 12000,
    })
}

fn document(quarters: &[(&str, &str, &str)], days: &[(&str, f64)]) -> Json {
    let mut doc = serde_json::Map::new();
    for (i, topic) in TOPICS.iter().enumerate() {
        let records: Vec<Json> = quarters
            .iter()
            .enumerate()
            .map(|(q, (date, year, period))| {
                quarter_record(i, date, year, period, (i * 10 + q) as f64)
            })
            .collect();
        doc.insert(topic.to_string(), Json::Array(records));
    }
    for window in WINDOWS {
        let records: Vec<Json> = days
            .iter()
            .map(|(date, close)| {
                let mut r = ohlcv(date, *close);
                r["rsi"] = json!(close / 2.0);
                r["sma"] = json!(close - 1.0);
                r
            })
            .collect();
        doc.insert(window.to_string(), Json::Array(records));
    }
    let historical: Vec<Json> = days.iter().map(|(d, c)| ohlcv(d, *c)).collect();
    doc.insert(
        "historicalPriceFull".to_string(),
        json!({ "symbol": "1101.TW", "historical": historical }),
    );
    Json::Object(doc)
}

fn standard_document() -> Json {
    document(
        &[
            ("2023-03-31", "2023", "Q1"),
            ("2023-06-30", "2023", "Q2"),
            ("2023-09-30", "2023", "Q3"),
        ],
        // Newest first, as the upstream feed delivers it; no day in Q3.
        &[("2023-06-01", 42.0), ("2023-04-05", 40.0), ("2023-02-10", 38.0)],
    )
}

fn config_for(dir: &Path, doc: &Json) -> PipelineConfig {
    let input = dir.join("input.json");
    fs::write(&input, serde_json::to_string_pretty(doc).unwrap()).unwrap();
    PipelineConfig {
        input,
        output_dir: dir.join("out"),
        ..PipelineConfig::default()
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn full_run_writes_both_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &standard_document());

    let out = run_pipeline(&config).unwrap();

    assert_eq!(out.summary.rows, 4);
    assert_eq!(out.summary.report.price_rows, 3);
    assert_eq!(out.summary.report.recovered_rows, 1);
    assert!(out.summary.aligned_path.ends_with("out/data_to_csv.csv"));

    let aligned = fs::read_to_string(&out.summary.aligned_path).unwrap();
    let header = aligned.lines().next().unwrap();
    assert!(header.starts_with("date_price,open,high,low,close,volume,symbol"));
    assert!(header.contains("rsi_tech252"));
    assert!(header.contains("metric4"));
    assert!(!header.contains("Start_Date"));
    assert_eq!(aligned.lines().count(), 5);

    let normalized = fs::read_to_string(&out.summary.normalized_path).unwrap();
    let norm_header = normalized.lines().next().unwrap();
    assert!(!norm_header.split(',').any(|c| c == "symbol" || c == "date_price"));
    assert!(!norm_header.split(',').any(|c| c == "period" || c == "date_info"));
    assert!(norm_header.split(',').any(|c| c == "close"));
    assert_eq!(normalized.lines().count(), 5);
}

#[test]
fn output_rows_are_in_trading_day_order_then_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &standard_document());

    let out = run_pipeline(&config).unwrap();
    let aligned = fs::read_to_string(&out.summary.aligned_path).unwrap();
    let first_cells: Vec<&str> = aligned
        .lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap())
        .collect();

    assert_eq!(first_cells, ["2023-02-10", "2023-04-05", "2023-06-01", ""]);
}

#[test]
fn repeated_runs_share_a_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &standard_document());

    let a = run_pipeline(&config).unwrap();
    let b = run_pipeline(&config).unwrap();

    assert_eq!(a.summary.fingerprint, b.summary.fingerprint);
    assert_eq!(a.summary.config_hash, b.summary.config_hash);
    assert_eq!(
        fs::read_to_string(&a.summary.aligned_path).unwrap(),
        fs::read_to_string(&b.summary.aligned_path).unwrap()
    );
}

#[test]
fn missing_section_is_a_load_error() {
    let mut doc = standard_document();
    doc.as_object_mut().unwrap().remove("tech60");
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), &doc);

    let err = run_pipeline(&config).unwrap_err();

    assert!(matches!(err, RunError::Load(_)));
    assert!(err.to_string().contains("tech60"));
    assert!(!config.aligned_path().exists());
}

#[test]
fn annual_rows_respect_the_configured_policy() {
    let doc = document(
        &[("2023-06-30", "2023", "Q2"), ("2023-12-31", "2023", "FY")],
        &[("2023-04-05", 40.0)],
    );

    let mut config = PipelineConfig::default();
    let err = align_document(&doc, &config).unwrap_err();
    assert!(matches!(err, RunError::Align(ref e) if e.is_unmapped_period()));

    config.unmapped_periods = UnmappedPeriodPolicy::Drop;
    let alignment = align_document(&doc, &config).unwrap();
    assert_eq!(alignment.report.dropped_rows, 1);
    assert_eq!(alignment.table.height(), 1);
}

#[test]
fn unreadable_input_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        input: dir.path().join("nope.json"),
        output_dir: dir.path().to_path_buf(),
        ..PipelineConfig::default()
    };

    let err = run_pipeline(&config).unwrap_err();
    assert!(err.to_string().contains("nope.json"));
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn normalized_values_stay_in_unit_interval(
        closes in prop::collection::vec(1.0f64..500.0, 1..20),
    ) {
        let days: Vec<(String, f64)> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("2023-04-{:02}", i + 1), *c))
            .collect();
        let day_refs: Vec<(&str, f64)> = days.iter().map(|(d, c)| (d.as_str(), *c)).collect();
        let doc = document(&[("2023-06-30", "2023", "Q2")], &day_refs);

        let config = PipelineConfig::default();
        let alignment = align_document(&doc, &config).unwrap();
        let df = fundalign_runner::normalize_table(&alignment.table, &config).unwrap();

        for column in df.get_columns() {
            for v in column.f64().unwrap().into_iter().flatten() {
                prop_assert!((0.0..=1.0).contains(&v), "{} out of range: {}", column.name(), v);
            }
        }
    }
}
