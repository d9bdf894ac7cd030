//! Series catalog: which (object, counter) pairs are tracked, and how
//!
//! Tracked metrics come in three shapes. Per-instance-over-time series get
//! one chart column per object instance with time on the x axis.
//! Per-instance-over-bucket series are histograms: same columns, but the
//! x axis is a fixed bucket list supplied by metadata. Counter-set series
//! group several counters that share a unit into one chart, one column per
//! counter, under a synthetic id.
//!
//! Classification is a single map lookup per row, so its cost does not
//! grow with the catalog.

use crate::table::TableOp;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identity of one tracked metric series
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SeriesKey {
    /// Per-instance-over-time: columns are instance names, rows timestamps
    TimeSeries { object: String, counter: String },
    /// Per-instance-over-bucket: columns are instance names, rows buckets
    Histogram { object: String, counter: String },
    /// Counter-set-over-time: columns are counter names, rows timestamps
    CounterSet { id: String },
}

impl SeriesKey {
    pub fn time_series(object: impl Into<String>, counter: impl Into<String>) -> Self {
        SeriesKey::TimeSeries {
            object: object.into(),
            counter: counter.into(),
        }
    }

    pub fn histogram(object: impl Into<String>, counter: impl Into<String>) -> Self {
        SeriesKey::Histogram {
            object: object.into(),
            counter: counter.into(),
        }
    }

    pub fn counter_set(id: impl Into<String>) -> Self {
        SeriesKey::CounterSet { id: id.into() }
    }

    /// True for shapes whose x axis is a bucket list rather than time
    pub fn is_histogram(&self) -> bool {
        matches!(self, SeriesKey::Histogram { .. })
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKey::TimeSeries { object, counter }
            | SeriesKey::Histogram { object, counter } => {
                write!(f, "{}_{}", object, counter)
            }
            SeriesKey::CounterSet { id } => write!(f, "{}", id),
        }
    }
}

/// Result of classifying one data row against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesMatch {
    TimeSeries,
    Histogram,
    CounterSet { id: String },
}

/// A group of counters sharing a unit, charted together under one id
#[derive(Debug, Clone)]
pub struct CounterSet {
    /// Synthetic chart id, unique within the catalog
    pub id: String,
    /// Object all member counters belong to
    pub object: String,
    /// Member counter names
    pub counters: Vec<String>,
}

/// A chart computed from two already-finalized tables after ingestion
///
/// Derived charts have no search key of their own; their values are
/// calculated cell-wise from the operand tables during post-processing.
#[derive(Debug, Clone)]
pub struct DerivedChart {
    /// Key the result table is stored and exported under
    pub key: SeriesKey,
    /// Unit assigned to the result
    pub unit: String,
    /// Cell-wise operation applied to the operands
    pub op: TableOp,
    pub operand1: SeriesKey,
    pub operand2: SeriesKey,
    /// Optional constant column appended to a non-empty result,
    /// drawn as a reference line by the chart renderer
    pub reference_line: Option<(String, f64)>,
    /// Clear the operand tables after the calculation so they are
    /// excluded from export
    pub clear_operands: bool,
}

/// Static classification of tracked metrics
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    time_series: Vec<(String, String)>,
    histograms: Vec<(String, String)>,
    counter_sets: Vec<CounterSet>,
    derived: Vec<DerivedChart>,
    index: HashMap<(String, String), SeriesMatch>,
}

impl Catalog {
    /// Create a new catalog builder
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Classify a data row by its (object, counter) pair.
    ///
    /// A pair matches at most one shape; pairs registered under several
    /// shapes resolve to the first registered one.
    pub fn classify(&self, object: &str, counter: &str) -> Option<SeriesMatch> {
        self.index
            .get(&(object.to_string(), counter.to_string()))
            .cloned()
    }

    /// All series keys in catalog order: time series, histograms,
    /// counter sets, then derived charts.
    pub fn series_keys(&self) -> Vec<SeriesKey> {
        let mut keys = Vec::new();
        for (object, counter) in &self.time_series {
            keys.push(SeriesKey::time_series(object, counter));
        }
        for (object, counter) in &self.histograms {
            keys.push(SeriesKey::histogram(object, counter));
        }
        for set in &self.counter_sets {
            keys.push(SeriesKey::counter_set(&set.id));
        }
        for chart in &self.derived {
            keys.push(chart.key.clone());
        }
        keys
    }

    /// Derived-chart definitions, in registration order
    pub fn derived_charts(&self) -> &[DerivedChart] {
        &self.derived
    }

    /// The default catalog of tracked device metrics.
    ///
    /// Covers aggregate throughput and write/read behavior, cache
    /// replacement, processor and disk utilization, per-volume and per-lun
    /// ops/latency/data rates, the lun read-alignment histogram, the
    /// system bandwidth and IOPS counter sets, raid stripe fragmentation,
    /// and the derived free-space-fragmentation chart.
    pub fn default_device_metrics() -> Self {
        let mut builder = Self::builder();

        for (object, counter) in [
            ("aggregate", "total_transfers"),
            ("aggregate", "user_writes"),
            ("aggregate", "cp_reads"),
            ("aggregate", "zombie_rate_blks_reclaimed"),
            ("ext_cache_obj", "hya_reads_replaced"),
            ("processor", "processor_busy"),
            ("disk:constituent", "disk_busy"),
            ("volume", "read_ops"),
            ("volume", "write_ops"),
            ("volume", "total_ops"),
            ("volume", "avg_latency"),
            ("volume", "read_data"),
            ("volume", "write_data"),
            ("volume", "repl_read_data"),
            ("volume", "repl_write_data"),
            ("lun:constituent", "total_ops"),
            ("lun:constituent", "avg_latency"),
            ("lun:constituent", "read_data"),
        ] {
            builder = builder.with_time_series(object, counter);
        }

        builder = builder.with_histogram("lun:constituent", "read_align_histo");

        builder = builder
            .with_counter_set(
                "bandwidth",
                "system:constituent",
                [
                    "hdd_data_read",
                    "hdd_data_written",
                    "net_data_recv",
                    "net_data_sent",
                    "ssd_data_read",
                    "ssd_data_written",
                    "fcp_data_recv",
                    "fcp_data_sent",
                    "tape_data_read",
                    "tape_data_written",
                ],
            )
            .with_counter_set(
                "IOPS",
                "system:constituent",
                ["nfs_ops", "cifs_ops", "fcp_ops", "iscsi_ops", "other_ops"],
            )
            .with_counter_set("fragmentation", "raid", ["partial_stripes", "full_stripes"]);

        builder = builder.with_derived_chart(DerivedChart {
            key: SeriesKey::time_series("aggregate", "free_space_fragmentation"),
            unit: String::new(),
            op: TableOp::Divide,
            operand1: SeriesKey::time_series("aggregate", "user_writes"),
            operand2: SeriesKey::time_series("aggregate", "cp_reads"),
            reference_line: Some(("reference".to_string(), 1.0)),
            clear_operands: true,
        });

        builder.build()
    }
}

/// Builder for Catalog
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    time_series: Vec<(String, String)>,
    histograms: Vec<(String, String)>,
    counter_sets: Vec<CounterSet>,
    derived: Vec<DerivedChart>,
}

impl CatalogBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a per-instance-over-time counter
    pub fn with_time_series(
        mut self,
        object: impl Into<String>,
        counter: impl Into<String>,
    ) -> Self {
        self.time_series.push((object.into(), counter.into()));
        self
    }

    /// Track a per-instance histogram counter
    pub fn with_histogram(
        mut self,
        object: impl Into<String>,
        counter: impl Into<String>,
    ) -> Self {
        self.histograms.push((object.into(), counter.into()));
        self
    }

    /// Track a set of same-unit counters as one chart
    pub fn with_counter_set<I, S>(
        mut self,
        id: impl Into<String>,
        object: impl Into<String>,
        counters: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.counter_sets.push(CounterSet {
            id: id.into(),
            object: object.into(),
            counters: counters.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Register a chart derived from two tracked tables
    pub fn with_derived_chart(mut self, chart: DerivedChart) -> Self {
        self.derived.push(chart);
        self
    }

    /// Build the catalog, resolving the classification index
    pub fn build(self) -> Catalog {
        let mut index = HashMap::new();

        for (object, counter) in &self.time_series {
            index
                .entry((object.clone(), counter.clone()))
                .or_insert(SeriesMatch::TimeSeries);
        }
        for (object, counter) in &self.histograms {
            index
                .entry((object.clone(), counter.clone()))
                .or_insert(SeriesMatch::Histogram);
        }
        for set in &self.counter_sets {
            for counter in &set.counters {
                index
                    .entry((set.object.clone(), counter.clone()))
                    .or_insert(SeriesMatch::CounterSet {
                        id: set.id.clone(),
                    });
            }
        }

        Catalog {
            time_series: self.time_series,
            histograms: self.histograms,
            counter_sets: self.counter_sets,
            derived: self.derived,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_by_lookup() {
        let catalog = Catalog::builder()
            .with_time_series("volume", "read_ops")
            .with_histogram("lun", "read_align_histo")
            .with_counter_set("iops", "system", ["nfs_ops", "cifs_ops"])
            .build();

        assert_eq!(
            catalog.classify("volume", "read_ops"),
            Some(SeriesMatch::TimeSeries)
        );
        assert_eq!(
            catalog.classify("lun", "read_align_histo"),
            Some(SeriesMatch::Histogram)
        );
        assert_eq!(
            catalog.classify("system", "cifs_ops"),
            Some(SeriesMatch::CounterSet {
                id: "iops".to_string()
            })
        );
        assert_eq!(catalog.classify("volume", "write_ops"), None);
        assert_eq!(catalog.classify("system", "read_ops"), None);
    }

    #[test]
    fn test_first_registration_wins() {
        let catalog = Catalog::builder()
            .with_time_series("volume", "read_ops")
            .with_histogram("volume", "read_ops")
            .build();

        assert_eq!(
            catalog.classify("volume", "read_ops"),
            Some(SeriesMatch::TimeSeries)
        );
    }

    #[test]
    fn test_default_catalog_shape() {
        let catalog = Catalog::default_device_metrics();

        assert_eq!(
            catalog.classify("aggregate", "total_transfers"),
            Some(SeriesMatch::TimeSeries)
        );
        assert_eq!(
            catalog.classify("lun:constituent", "read_align_histo"),
            Some(SeriesMatch::Histogram)
        );
        assert_eq!(
            catalog.classify("system:constituent", "nfs_ops"),
            Some(SeriesMatch::CounterSet {
                id: "IOPS".to_string()
            })
        );

        // derived chart key is exported but never classified
        assert_eq!(catalog.classify("aggregate", "free_space_fragmentation"), None);
        assert_eq!(catalog.derived_charts().len(), 1);

        let keys = catalog.series_keys();
        assert!(keys.contains(&SeriesKey::time_series("volume", "avg_latency")));
        assert!(keys.contains(&SeriesKey::counter_set("bandwidth")));
        assert_eq!(
            keys.last(),
            Some(&SeriesKey::time_series("aggregate", "free_space_fragmentation"))
        );
    }
}
