//! Metadata phase: units, base links and bucket labels
//!
//! Description rows must be consumed before any data row, because rate
//! extraction and base resolution consult the maps registered here; the
//! engine never re-derives base relationships from data rows.

use super::SnapshotEngine;
use crate::catalog::{SeriesKey, SeriesMatch};
use crate::record::{self, Record};
use crate::Result;

use tracing::warn;

impl SnapshotEngine {
    /// Consume one description row.
    ///
    /// Rows that match a catalog entry register their unit; a non-empty
    /// `base` field links the named counter as this counter's
    /// denominator; histogram entries register their comma-separated
    /// bucket labels. Rows with missing fields are logged and skipped.
    pub fn add_metadata(&mut self, record: &Record) {
        if let Err(err) = self.try_add_metadata(record) {
            warn!(error = %err, "description row skipped");
        }
    }

    fn try_add_metadata(&mut self, record: &Record) -> Result<()> {
        let object = record.get(record::OBJECT_FIELD)?;
        let counter = record.get(record::COUNTER_FIELD)?;

        let Some(matched) = self.catalog.classify(object, counter) else {
            return Ok(());
        };

        match matched {
            SeriesMatch::TimeSeries => {
                let unit = record.get(record::UNIT_FIELD)?;
                self.units
                    .insert(SeriesKey::time_series(object, counter), unit.to_string());

                if let Some(base) = non_empty(record.get_optional(record::BASE_FIELD)) {
                    self.base_links
                        .insert((object.to_string(), base.to_string()), counter.to_string());
                }
            }
            SeriesMatch::Histogram => {
                let unit = record.get(record::UNIT_FIELD)?;
                let labels = record.get(record::BUCKET_LABELS_FIELD)?;
                let key = SeriesKey::histogram(object, counter);

                self.units.insert(key.clone(), unit.to_string());
                self.bucket_labels
                    .insert(key, labels.split(',').map(str::to_string).collect());

                if let Some(base) = non_empty(record.get_optional(record::BASE_FIELD)) {
                    self.histogram_base_links
                        .insert((object.to_string(), base.to_string()), counter.to_string());
                }
            }
            SeriesMatch::CounterSet { id } => {
                let unit = record.get(record::UNIT_FIELD)?;
                self.units
                    .insert(SeriesKey::counter_set(id), unit.to_string());
            }
        }

        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
