//! Data phase: cumulative samples to per-interval rates
//!
//! Raw counter values never reset, so a single sample is meaningless; the
//! chart value for a series is always
//! `(value - previous value) / (timestamp - previous timestamp)` over the
//! two most recent samples. The buffer below keeps that previous sample
//! per series and instance.
//!
//! Two samples of one series with the same timestamp make the quotient
//! undefined. Such a sample is dropped and the buffer keeps the older
//! sample as the comparison point for whatever arrives next.

use super::SnapshotEngine;
use crate::catalog::{SeriesKey, SeriesMatch};
use crate::record::{self, Record};
use crate::table::RowKey;
use crate::Result;

use std::collections::HashMap;
use tracing::{debug, warn};

/// Last-seen sample of one series/instance
#[derive(Debug, Clone)]
pub(super) struct LastSample {
    pub timestamp: i64,
    pub value: SampleValue,
}

/// Sample payload: scalar for ordinary counters, one value per bucket for
/// histogram counters
#[derive(Debug, Clone)]
pub(super) enum SampleValue {
    Scalar(f64),
    List(Vec<f64>),
}

/// Per-series last-sample store, keyed by (object, counter, instance).
///
/// Counter-set series have no instance and use `None` in the key slot.
#[derive(Debug, Default)]
pub(super) struct SampleBuffer {
    entries: HashMap<(String, String, Option<String>), LastSample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        object: &str,
        counter: &str,
        instance: Option<&str>,
    ) -> Option<&LastSample> {
        self.entries.get(&buffer_key(object, counter, instance))
    }

    /// Record the current sample as the new comparison point
    pub fn advance(
        &mut self,
        object: &str,
        counter: &str,
        instance: Option<&str>,
        timestamp: i64,
        value: SampleValue,
    ) {
        self.entries
            .insert(buffer_key(object, counter, instance), LastSample { timestamp, value });
    }
}

fn buffer_key(
    object: &str,
    counter: &str,
    instance: Option<&str>,
) -> (String, String, Option<String>) {
    (
        object.to_string(),
        counter.to_string(),
        instance.map(str::to_string),
    )
}

impl SnapshotEngine {
    /// Extract tracked-series rates from one data row
    pub(super) fn extract_series(&mut self, record: &Record) {
        if let Err(err) = self.try_extract_series(record) {
            warn!(error = %err, "data row skipped");
        }
    }

    fn try_extract_series(&mut self, record: &Record) -> Result<()> {
        let object = record.get(record::OBJECT_FIELD)?.to_string();

        // the first row seen for the identity object names the node
        if self.node_name.is_none() && object == self.config.identity_object {
            if let Some(instance) = record.get_optional(record::INSTANCE_FIELD) {
                debug!(node = instance, "captured node name");
                self.node_name = Some(instance.to_string());
            }
        }

        let counter = record.get(record::COUNTER_FIELD)?.to_string();
        let Some(matched) = self.catalog.classify(&object, &counter) else {
            return Ok(());
        };

        match matched {
            SeriesMatch::TimeSeries => {
                let timestamp = record.timestamp()?;
                let instance = record.get(record::INSTANCE_FIELD)?.to_string();
                let value = record.scalar_value()?;

                if let Some(prev) = self.buffer.get(&object, &counter, Some(instance.as_str())).cloned() {
                    if prev.timestamp == timestamp {
                        warn!(
                            object = %object,
                            counter = %counter,
                            instance = %instance,
                            timestamp,
                            "sample repeats the previous timestamp of its series, dropped"
                        );
                        return Ok(());
                    }
                    if let SampleValue::Scalar(prev_value) = prev.value {
                        let rate = (value - prev_value) / (timestamp - prev.timestamp) as f64;
                        self.tables
                            .entry(SeriesKey::time_series(&object, &counter))
                            .or_default()
                            .insert(RowKey::from_unix_seconds(timestamp), instance.clone(), rate);
                    }
                }
                self.buffer.advance(
                    &object,
                    &counter,
                    Some(instance.as_str()),
                    timestamp,
                    SampleValue::Scalar(value),
                );
            }
            SeriesMatch::Histogram => {
                let timestamp = record.timestamp()?;
                let instance = record.get(record::INSTANCE_FIELD)?.to_string();
                let values = record.value_list()?;

                if let Some(prev) = self.buffer.get(&object, &counter, Some(instance.as_str())).cloned() {
                    if prev.timestamp == timestamp {
                        warn!(
                            object = %object,
                            counter = %counter,
                            instance = %instance,
                            timestamp,
                            "histogram sample repeats the previous timestamp of its series, dropped"
                        );
                        return Ok(());
                    }
                    if let SampleValue::List(prev_values) = prev.value {
                        if prev_values.len() != values.len() {
                            warn!(
                                object = %object,
                                counter = %counter,
                                instance = %instance,
                                "histogram sample changed bucket count, series rebaselined"
                            );
                        } else {
                            let elapsed = (timestamp - prev.timestamp) as f64;
                            let table = self
                                .tables
                                .entry(SeriesKey::histogram(&object, &counter))
                                .or_default();
                            for (bucket, (current, previous)) in
                                values.iter().zip(&prev_values).enumerate()
                            {
                                table.insert(
                                    RowKey::Bucket(bucket),
                                    instance.clone(),
                                    (current - previous) / elapsed,
                                );
                            }
                        }
                    }
                }
                self.buffer.advance(
                    &object,
                    &counter,
                    Some(instance.as_str()),
                    timestamp,
                    SampleValue::List(values),
                );
            }
            SeriesMatch::CounterSet { id } => {
                let timestamp = record.timestamp()?;
                let value = record.scalar_value()?;

                if let Some(prev) = self.buffer.get(&object, &counter, None).cloned() {
                    if prev.timestamp == timestamp {
                        warn!(
                            object = %object,
                            counter = %counter,
                            timestamp,
                            "sample repeats the previous timestamp of its series, dropped"
                        );
                        return Ok(());
                    }
                    if let SampleValue::Scalar(prev_value) = prev.value {
                        let rate = (value - prev_value) / (timestamp - prev.timestamp) as f64;
                        self.tables
                            .entry(SeriesKey::counter_set(&id))
                            .or_default()
                            .insert(RowKey::from_unix_seconds(timestamp), counter.clone(), rate);
                    }
                }
                self.buffer
                    .advance(&object, &counter, None, timestamp, SampleValue::Scalar(value));
            }
        }

        Ok(())
    }
}
