//! Counter normalization and ratio-resolution engine
//!
//! The engine consumes two row streams from the export parser. Description
//! rows (the metadata phase) register units, base-counter links and
//! histogram bucket labels. Data rows (the ingestion phase) carry
//! cumulative counter samples; the engine differences consecutive samples
//! of each series into per-interval rates and stores them in per-series
//! value tables. Counters flagged as bases are differenced the same way
//! and divide their subject's stored rate in place, deferring conversions
//! whose subject has not arrived yet.
//!
//! Phases are strictly ordered per ingestion run:
//! `add_metadata`* → `add_sample`* → `finalize` → `post_process` → export.
//!
//! One engine instance owns all run state. Ingesting independent sources
//! in parallel means one engine per source; nothing here is shared.

mod extractor;
mod postprocess;
mod registrar;
mod resolver;

use crate::catalog::{Catalog, SeriesKey};
use crate::record::Record;
use crate::table::{FlatTable, ValueTable};

use extractor::SampleBuffer;
use resolver::PendingBaseConversion;

use serde::Serialize;
use std::collections::HashMap;

/// Configuration for a snapshot engine run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Object whose first data row names the monitored node.
    /// The captured instance name is used for chart titling.
    pub identity_object: String,
    /// Minimum number of value fields per flattened export row.
    /// Rows are padded with blanks up to this width so chart files
    /// keep a constant column count.
    pub fill_width: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identity_object: "system:constituent".to_string(),
            fill_width: 0,
        }
    }
}

/// One flattened chart table with its export metadata
#[derive(Debug, Clone, Serialize)]
pub struct ChartExport {
    /// Series the table belongs to
    pub key: SeriesKey,
    /// Final unit string after post-processing
    pub unit: String,
    /// Table with `headers[0]` naming the x axis (`time` or `bucket`)
    pub table: FlatTable,
}

/// Counter normalization engine for one ingestion run
#[derive(Debug)]
pub struct SnapshotEngine {
    config: EngineConfig,
    catalog: Catalog,
    /// One value table per catalog series
    tables: HashMap<SeriesKey, ValueTable>,
    /// Unit per series, from the metadata phase (rewritten by post-processing)
    units: HashMap<SeriesKey, String>,
    /// Ordered bucket labels per histogram series, from the metadata phase
    bucket_labels: HashMap<SeriesKey, Vec<String>>,
    /// Last-sample buffer for tracked series
    buffer: SampleBuffer,
    /// Separate last-sample buffer for base counters, so a counter that is
    /// both tracked and used as a base corrupts neither computation
    base_buffer: SampleBuffer,
    /// (object, base counter) -> subject counter, time-series shape
    base_links: HashMap<(String, String), String>,
    /// (object, base counter) -> subject counter, histogram shape
    histogram_base_links: HashMap<(String, String), String>,
    /// Conversions whose subject cell did not exist yet, replayed at finalize
    pending: Vec<PendingBaseConversion>,
    /// Node name captured from the first identity-object row
    node_name: Option<String>,
}

impl SnapshotEngine {
    /// Create an engine for one ingestion run
    pub fn new(catalog: Catalog, config: EngineConfig) -> Self {
        let tables = catalog
            .series_keys()
            .into_iter()
            .map(|key| (key, ValueTable::new()))
            .collect();

        Self {
            config,
            catalog,
            tables,
            units: HashMap::new(),
            bucket_labels: HashMap::new(),
            buffer: SampleBuffer::new(),
            base_buffer: SampleBuffer::new(),
            base_links: HashMap::new(),
            histogram_base_links: HashMap::new(),
            pending: Vec::new(),
            node_name: None,
        }
    }

    /// Engine over the default device-metric catalog
    pub fn with_default_catalog() -> Self {
        Self::new(Catalog::default_device_metrics(), EngineConfig::default())
    }

    /// Consume one data row: extract tracked series rates, then scan the
    /// same row for base-counter matches.
    pub fn add_sample(&mut self, record: &Record) {
        self.extract_series(record);
        self.extract_bases(record);
    }

    /// The catalog this run classifies against
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All per-series value tables
    pub fn tables(&self) -> &HashMap<SeriesKey, ValueTable> {
        &self.tables
    }

    /// One series' value table
    pub fn table(&self, key: &SeriesKey) -> Option<&ValueTable> {
        self.tables.get(key)
    }

    /// Final unit string per series
    pub fn units(&self) -> &HashMap<SeriesKey, String> {
        &self.units
    }

    /// One series' unit, if the metadata phase saw it
    pub fn unit(&self, key: &SeriesKey) -> Option<&str> {
        self.units.get(key).map(String::as_str)
    }

    /// Ordered bucket labels per histogram series
    pub fn bucket_labels(&self) -> &HashMap<SeriesKey, Vec<String>> {
        &self.bucket_labels
    }

    /// Node name captured from the identity object, if any row carried it
    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    /// Flatten every non-empty table for tabular export, in catalog order.
    ///
    /// `headers[0]` names the x axis: `bucket` for histogram series,
    /// `time` for everything else.
    pub fn flat_tables(&self) -> Vec<ChartExport> {
        let mut exports = Vec::new();
        for key in self.catalog.series_keys() {
            let Some(table) = self.tables.get(&key) else {
                continue;
            };
            if table.is_empty() {
                continue;
            }
            let x_label = if key.is_histogram() { "bucket" } else { "time" };
            let mut flat = table.flatten(None, None, self.config.fill_width);
            flat.headers[0] = x_label.to_string();
            exports.push(ChartExport {
                unit: self.units.get(&key).cloned().unwrap_or_default(),
                key,
                table: flat,
            });
        }
        exports
    }
}
