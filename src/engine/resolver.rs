//! Base resolution: denominator rates divide their subject's cells
//!
//! A base counter normalizes another counter: the subject's stored rate
//! divided by the base's rate over the same interval gives the true
//! average (latency per operation, say). Bases are differenced exactly
//! like tracked series, in their own buffer namespace, because a counter
//! may be tracked and serve as a base at the same time.
//!
//! The record stream does not order a base against its subject. When the
//! base's rate is ready before the subject's cell exists, the conversion
//! is parked and replayed once after the whole stream is consumed.

use super::extractor::SampleValue;
use super::SnapshotEngine;
use crate::catalog::SeriesKey;
use crate::record::{self, Record};
use crate::table::RowKey;
use crate::Result;

use tracing::{debug, warn};

/// A ratio conversion waiting for its subject cell to exist
#[derive(Debug, Clone)]
pub(super) struct PendingBaseConversion {
    pub key: SeriesKey,
    pub instance: String,
    pub row: RowKey,
    pub denominator_rate: f64,
}

impl SnapshotEngine {
    /// Scan one data row for base-counter matches
    pub(super) fn extract_bases(&mut self, record: &Record) {
        if let Err(err) = self.try_extract_bases(record) {
            warn!(error = %err, "data row skipped during base scan");
        }
    }

    fn try_extract_bases(&mut self, record: &Record) -> Result<()> {
        let object = record.get(record::OBJECT_FIELD)?.to_string();
        let counter = record.get(record::COUNTER_FIELD)?.to_string();

        self.scan_series_base(record, &object, &counter)?;
        self.scan_histogram_base(record, &object, &counter)?;
        Ok(())
    }

    fn scan_series_base(&mut self, record: &Record, object: &str, counter: &str) -> Result<()> {
        let link = (object.to_string(), counter.to_string());
        let Some(subject) = self.base_links.get(&link).cloned() else {
            return Ok(());
        };

        let timestamp = record.timestamp()?;
        let instance = record.get(record::INSTANCE_FIELD)?.to_string();
        let value = record.scalar_value()?;

        if let Some(prev) = self.base_buffer.get(object, counter, Some(instance.as_str())).cloned() {
            if prev.timestamp == timestamp {
                warn!(
                    object = %object,
                    counter = %counter,
                    instance = %instance,
                    timestamp,
                    "base sample repeats the previous timestamp of its series, dropped"
                );
                return Ok(());
            }
            if let SampleValue::Scalar(prev_value) = prev.value {
                let denominator = (value - prev_value) / (timestamp - prev.timestamp) as f64;
                self.resolve_or_defer(
                    SeriesKey::time_series(object, subject),
                    instance.clone(),
                    RowKey::from_unix_seconds(timestamp),
                    denominator,
                );
            }
        }
        self.base_buffer.advance(
            object,
            counter,
            Some(instance.as_str()),
            timestamp,
            SampleValue::Scalar(value),
        );
        Ok(())
    }

    /// Histogram bases are not bucketed themselves: one denominator rate
    /// divides every bucket of the subject histogram.
    fn scan_histogram_base(&mut self, record: &Record, object: &str, counter: &str) -> Result<()> {
        let link = (object.to_string(), counter.to_string());
        let Some(subject) = self.histogram_base_links.get(&link).cloned() else {
            return Ok(());
        };

        let timestamp = record.timestamp()?;
        let instance = record.get(record::INSTANCE_FIELD)?.to_string();
        let value = record.scalar_value()?;

        if let Some(prev) = self.base_buffer.get(object, counter, Some(instance.as_str())).cloned() {
            if prev.timestamp == timestamp {
                warn!(
                    object = %object,
                    counter = %counter,
                    instance = %instance,
                    timestamp,
                    "base sample repeats the previous timestamp of its series, dropped"
                );
                return Ok(());
            }
            if let SampleValue::Scalar(prev_value) = prev.value {
                let denominator = (value - prev_value) / (timestamp - prev.timestamp) as f64;
                let key = SeriesKey::histogram(object, &subject);
                match self.bucket_labels.get(&key).map(Vec::len) {
                    Some(bucket_count) => {
                        for bucket in 0..bucket_count {
                            self.resolve_or_defer(
                                key.clone(),
                                instance.clone(),
                                RowKey::Bucket(bucket),
                                denominator,
                            );
                        }
                    }
                    None => warn!(
                        series = %key,
                        "histogram base has no registered bucket labels, conversion skipped"
                    ),
                }
            }
        }
        self.base_buffer.advance(
            object,
            counter,
            Some(instance.as_str()),
            timestamp,
            SampleValue::Scalar(value),
        );
        Ok(())
    }

    fn resolve_or_defer(
        &mut self,
        key: SeriesKey,
        instance: String,
        row: RowKey,
        denominator_rate: f64,
    ) {
        let table = self.tables.entry(key.clone()).or_default();
        if table.resolve_ratio(&row, &instance, denominator_rate).is_err() {
            debug!(
                series = %key,
                instance = %instance,
                row = %row,
                "base arrived before its subject, conversion deferred"
            );
            self.pending.push(PendingBaseConversion {
                key,
                instance,
                row,
                denominator_rate,
            });
        }
    }

    /// Replay deferred base conversions. Call exactly once, after the
    /// whole record stream has been consumed; replay order is not
    /// guaranteed. Conversions whose subject never arrived at all are
    /// dropped here.
    pub fn finalize(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for conversion in pending {
            let table = self.tables.entry(conversion.key.clone()).or_default();
            if table
                .resolve_ratio(&conversion.row, &conversion.instance, conversion.denominator_rate)
                .is_err()
            {
                warn!(
                    series = %conversion.key,
                    instance = %conversion.instance,
                    row = %conversion.row,
                    "base value never found a matching subject value, dropped"
                );
            }
        }
    }
}
