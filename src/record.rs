//! Flat field-map records handed over by the export parser
//!
//! The engine does not read any raw export format itself. An external
//! collaborator parses the device export and delivers each row as a flat
//! map of field names to text values; this module wraps that map with
//! `Result`-returning access so missing or malformed fields surface as
//! typed errors instead of panics.

use crate::{Error, Result};
use std::collections::HashMap;

/// Standard field names
pub const OBJECT_FIELD: &str = "object";
pub const COUNTER_FIELD: &str = "counter";
pub const INSTANCE_FIELD: &str = "instance";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const VALUE_FIELD: &str = "value";
pub const UNIT_FIELD: &str = "unit";
pub const BASE_FIELD: &str = "base";
pub const BUCKET_LABELS_FIELD: &str = "label1";

/// One parsed row from a device export, as a flat field map.
///
/// Both description rows (object, counter, unit, base, label1) and data
/// rows (object, counter, instance, timestamp, value) use this shape; the
/// engine decides which fields it needs per phase.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Get a required field's text content
    pub fn get(&self, field: &str) -> Result<&str> {
        self.fields
            .get(field)
            .map(|s| s.as_str())
            .ok_or_else(|| Error::MissingField(field.to_string()))
    }

    /// Get an optional field's text content
    pub fn get_optional(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.as_str())
    }

    /// Parse the sample timestamp as integer seconds
    pub fn timestamp(&self) -> Result<i64> {
        let raw = self.get(TIMESTAMP_FIELD)?;
        raw.parse::<i64>().map_err(|_| Error::InvalidValue {
            field: TIMESTAMP_FIELD.to_string(),
            value: raw.to_string(),
        })
    }

    /// Parse the value field as a scalar
    pub fn scalar_value(&self) -> Result<f64> {
        let raw = self.get(VALUE_FIELD)?;
        raw.trim().parse::<f64>().map_err(|_| Error::InvalidValue {
            field: VALUE_FIELD.to_string(),
            value: raw.to_string(),
        })
    }

    /// Parse the value field as a comma-separated list (histogram rows)
    pub fn value_list(&self) -> Result<Vec<f64>> {
        let raw = self.get(VALUE_FIELD)?;
        raw.split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| Error::InvalidValue {
                    field: VALUE_FIELD.to_string(),
                    value: raw.to_string(),
                })
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
