//! # counterflow
//!
//! Turns streams of cumulative telemetry counters into time-indexed,
//! human-interpretable metric series.
//!
//! Monitored devices export counters as monotonically increasing totals,
//! so a chart value is always the rate between two consecutive samples of
//! one series. Some metrics only make sense as a ratio of two
//! independently sampled counters (average latency is Δlatency-sum over
//! Δoperation-count); the denominator can arrive anywhere in the stream
//! relative to its subject and is matched up lazily, if necessary after
//! the stream has ended.
//!
//! ## Architecture
//!
//! - **Catalog**: static classification of tracked (object, counter)
//!   pairs into three series shapes
//! - **Engine**: per-run state machine — metadata registration, rate
//!   extraction, base-ratio resolution, post-processing
//! - **Tables**: sparse ordered value tables with cell-wise combination
//!   and flattening for tabular export
//!
//! ## Usage
//!
//! ```
//! use counterflow::prelude::*;
//!
//! let catalog = Catalog::builder()
//!     .with_time_series("volume", "read_ops")
//!     .build();
//! let mut engine = SnapshotEngine::new(catalog, EngineConfig::default());
//!
//! // metadata phase, then data phase (rows come from an export parser)
//! let row: Record = [
//!     ("object", "volume"),
//!     ("counter", "read_ops"),
//!     ("instance", "vol0"),
//!     ("timestamp", "1514764800"),
//!     ("value", "1000"),
//! ]
//! .into_iter()
//! .collect();
//! engine.add_sample(&row);
//!
//! engine.finalize();
//! engine.post_process();
//! let charts = engine.flat_tables();
//! # assert!(charts.is_empty()); // a single sample yields no rate yet
//! ```

pub mod catalog;
pub mod engine;
pub mod record;
pub mod table;
pub mod telemetry;

mod error;

pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogBuilder, DerivedChart, SeriesKey};
    pub use crate::engine::{ChartExport, EngineConfig, SnapshotEngine};
    pub use crate::record::Record;
    pub use crate::table::{combine_tables, FlatTable, RowKey, TableOp, ValueTable};
    pub use crate::{Error, Result};
}
