//! Time series returned by datasource queries.

use serde::Serialize;

/// A single label pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// A series with its labels and samples.
///
/// Instant queries produce one sample per series; range queries produce
/// one sample per step. Labels are kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metric {
    pub labels: Vec<Label>,
    /// Unix timestamps in seconds.
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

impl Metric {
    /// Set a label, replacing any existing value for `name`.
    pub fn add_label(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.labels.binary_search_by(|l| l.name.as_str().cmp(&name)) {
            Ok(idx) => self.labels[idx].value = value,
            Err(idx) => self.labels.insert(idx, Label { name, value }),
        }
    }

    /// Value of the label `name`, if present.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .binary_search_by(|l| l.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.labels[idx].value.as_str())
    }

    pub(crate) fn push_sample(&mut self, timestamp: i64, value: f64) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }
}
