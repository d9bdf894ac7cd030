//! Tests for the rate-extraction path
//!
//! These tests verify the core differencing behavior:
//! - First samples establish the buffer without writing
//! - Rates are value delta over time delta
//! - Duplicate timestamps drop the sample and keep the old buffer entry
//! - Histogram value lists are differenced elementwise
//! - Rows with missing fields are skipped without aborting ingestion

use counterflow::catalog::{Catalog, SeriesKey};
use counterflow::engine::{EngineConfig, SnapshotEngine};
use counterflow::record::Record;
use counterflow::table::RowKey;

fn data_row(object: &str, counter: &str, instance: &str, timestamp: i64, value: &str) -> Record {
    [
        ("object", object),
        ("counter", counter),
        ("instance", instance),
        ("timestamp", &timestamp.to_string()),
        ("value", value),
    ]
    .into_iter()
    .collect()
}

fn volume_engine() -> SnapshotEngine {
    let catalog = Catalog::builder()
        .with_time_series("volume", "read_ops")
        .build();
    SnapshotEngine::new(catalog, EngineConfig::default())
}

// =========================================================================
// Scalar rate extraction
// =========================================================================

#[test]
fn test_first_sample_writes_nothing() {
    let mut engine = volume_engine();
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 0, "100"));

    let key = SeriesKey::time_series("volume", "read_ops");
    assert!(engine.table(&key).unwrap().is_empty());
}

#[test]
fn test_second_sample_writes_rate() {
    let mut engine = volume_engine();
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 0, "100"));
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 10, "150"));

    let key = SeriesKey::time_series("volume", "read_ops");
    let table = engine.table(&key).unwrap();
    assert_eq!(
        table.get(&RowKey::from_unix_seconds(10), "vol0").unwrap(),
        5.0
    );
}

#[test]
fn test_instances_are_independent_series() {
    let mut engine = volume_engine();
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 0, "100"));
    engine.add_sample(&data_row("volume", "read_ops", "vol1", 0, "1000"));
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 10, "150"));
    engine.add_sample(&data_row("volume", "read_ops", "vol1", 10, "1200"));

    let key = SeriesKey::time_series("volume", "read_ops");
    let table = engine.table(&key).unwrap();
    let row = RowKey::from_unix_seconds(10);
    assert_eq!(table.get(&row, "vol0").unwrap(), 5.0);
    assert_eq!(table.get(&row, "vol1").unwrap(), 20.0);
}

#[test]
fn test_duplicate_timestamp_drops_sample_and_keeps_buffer() {
    let mut engine = volume_engine();
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 0, "100"));
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 10, "150"));
    // same timestamp as before: dropped, buffer must NOT advance to 999
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 10, "999"));
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 20, "250"));

    let key = SeriesKey::time_series("volume", "read_ops");
    let table = engine.table(&key).unwrap();
    let row = RowKey::from_unix_seconds(20);
    // diffed against the t=10 value 150, not the dropped 999
    assert_eq!(table.get(&row, "vol0").unwrap(), 10.0);
    // and the dropped sample never produced a cell of its own
    assert_eq!(
        table.get(&RowKey::from_unix_seconds(10), "vol0").unwrap(),
        5.0
    );
}

#[test]
fn test_untracked_rows_are_ignored() {
    let mut engine = volume_engine();
    engine.add_sample(&data_row("volume", "write_ops", "vol0", 0, "100"));
    engine.add_sample(&data_row("volume", "write_ops", "vol0", 10, "150"));
    engine.add_sample(&data_row("aggregate", "read_ops", "aggr0", 0, "100"));

    let key = SeriesKey::time_series("volume", "read_ops");
    assert!(engine.table(&key).unwrap().is_empty());
}

// =========================================================================
// Degraded rows
// =========================================================================

#[test]
fn test_missing_field_skips_row_without_aborting() {
    let mut engine = volume_engine();
    let mut row = Record::new();
    row.set("object", "volume").set("counter", "read_ops");
    // no instance, timestamp, value
    engine.add_sample(&row);

    // ingestion continues normally afterwards
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 0, "100"));
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 10, "150"));

    let key = SeriesKey::time_series("volume", "read_ops");
    assert_eq!(
        engine
            .table(&key)
            .unwrap()
            .get(&RowKey::from_unix_seconds(10), "vol0")
            .unwrap(),
        5.0
    );
}

#[test]
fn test_unparseable_value_skips_row() {
    let mut engine = volume_engine();
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 0, "100"));
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 10, "garbage"));
    engine.add_sample(&data_row("volume", "read_ops", "vol0", 20, "300"));

    let key = SeriesKey::time_series("volume", "read_ops");
    let table = engine.table(&key).unwrap();
    // the bad row neither wrote nor advanced the buffer
    assert!(table.get(&RowKey::from_unix_seconds(10), "vol0").is_err());
    assert_eq!(
        table.get(&RowKey::from_unix_seconds(20), "vol0").unwrap(),
        10.0
    );
}

// =========================================================================
// Histogram series
// =========================================================================

#[test]
fn test_histogram_rates_are_elementwise() {
    let catalog = Catalog::builder()
        .with_histogram("lun", "read_align_histo")
        .build();
    let mut engine = SnapshotEngine::new(catalog, EngineConfig::default());

    engine.add_sample(&data_row("lun", "read_align_histo", "lun0", 0, "1,2,3"));
    engine.add_sample(&data_row("lun", "read_align_histo", "lun0", 10, "2,4,6"));

    let key = SeriesKey::histogram("lun", "read_align_histo");
    let table = engine.table(&key).unwrap();
    assert_eq!(table.get(&RowKey::Bucket(0), "lun0").unwrap(), 0.1);
    assert_eq!(table.get(&RowKey::Bucket(1), "lun0").unwrap(), 0.2);
    assert_eq!(table.get(&RowKey::Bucket(2), "lun0").unwrap(), 0.3);
}

#[test]
fn test_histogram_duplicate_timestamp_dropped() {
    let catalog = Catalog::builder()
        .with_histogram("lun", "read_align_histo")
        .build();
    let mut engine = SnapshotEngine::new(catalog, EngineConfig::default());

    engine.add_sample(&data_row("lun", "read_align_histo", "lun0", 0, "1,2,3"));
    engine.add_sample(&data_row("lun", "read_align_histo", "lun0", 0, "9,9,9"));
    engine.add_sample(&data_row("lun", "read_align_histo", "lun0", 10, "2,4,6"));

    let key = SeriesKey::histogram("lun", "read_align_histo");
    let table = engine.table(&key).unwrap();
    assert_eq!(table.get(&RowKey::Bucket(0), "lun0").unwrap(), 0.1);
}

// =========================================================================
// Counter-set series
// =========================================================================

#[test]
fn test_counter_set_columns_are_counter_names() {
    let catalog = Catalog::builder()
        .with_counter_set("iops", "system", ["nfs_ops", "cifs_ops"])
        .build();
    let mut engine = SnapshotEngine::new(catalog, EngineConfig::default());

    engine.add_sample(&data_row("system", "nfs_ops", "node1", 0, "1000"));
    engine.add_sample(&data_row("system", "cifs_ops", "node1", 0, "500"));
    engine.add_sample(&data_row("system", "nfs_ops", "node1", 10, "1100"));
    engine.add_sample(&data_row("system", "cifs_ops", "node1", 10, "540"));

    let key = SeriesKey::counter_set("iops");
    let table = engine.table(&key).unwrap();
    let row = RowKey::from_unix_seconds(10);
    assert_eq!(table.get(&row, "nfs_ops").unwrap(), 10.0);
    assert_eq!(table.get(&row, "cifs_ops").unwrap(), 4.0);
}

// =========================================================================
// Node identity capture
// =========================================================================

#[test]
fn test_node_name_captured_once_from_identity_object() {
    let catalog = Catalog::builder()
        .with_counter_set("iops", "system", ["nfs_ops"])
        .build();
    let config = EngineConfig {
        identity_object: "system".to_string(),
        ..EngineConfig::default()
    };
    let mut engine = SnapshotEngine::new(catalog, config);
    assert_eq!(engine.node_name(), None);

    engine.add_sample(&data_row("system", "nfs_ops", "node1", 0, "1000"));
    engine.add_sample(&data_row("system", "nfs_ops", "node2", 10, "1100"));

    // first identity row wins, later rows never overwrite
    assert_eq!(engine.node_name(), Some("node1"));
}
