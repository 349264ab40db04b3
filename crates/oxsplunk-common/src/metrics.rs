//! Metric definitions and the builder that turns recorded values into a
//! [`MetricSnapshot`].
//!
//! The builder owns naming, units and value types. Scrape tasks only hand it
//! `(timestamp, value, attribute)` tuples.

use crate::types::{MetricDataPoint, MetricSnapshot, MetricValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Every metric this collector knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    SplunkLicenseIndexUsage,
    SplunkIndexerThroughput,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::SplunkLicenseIndexUsage => "splunk.license.index.usage",
            Metric::SplunkIndexerThroughput => "splunk.indexer.throughput",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::SplunkLicenseIndexUsage => "By",
            Metric::SplunkIndexerThroughput => "By/s",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Metric::SplunkLicenseIndexUsage => "Gauge tracking the indexed license usage per index",
            Metric::SplunkIndexerThroughput => "Gauge tracking average bytes per second throughput of indexer",
        }
    }

    /// Label key carried by every datapoint of this metric.
    pub fn attribute(self) -> &'static str {
        match self {
            Metric::SplunkLicenseIndexUsage => "index",
            Metric::SplunkIndexerThroughput => "status",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_enabled() -> bool {
    true
}

/// Per-metric toggles. Every metric is enabled unless configured otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSettings {
    #[serde(default)]
    pub splunk_license_index_usage: MetricSettings,
    #[serde(default)]
    pub splunk_indexer_throughput: MetricSettings,
}

impl MetricsSettings {
    pub fn get(&self, metric: Metric) -> &MetricSettings {
        match metric {
            Metric::SplunkLicenseIndexUsage => &self.splunk_license_index_usage,
            Metric::SplunkIndexerThroughput => &self.splunk_indexer_throughput,
        }
    }

    pub fn is_enabled(&self, metric: Metric) -> bool {
        self.get(metric).enabled
    }
}

/// Accumulates datapoints for one cycle.
///
/// Recording only appends; nothing recorded by one task is ever replaced by
/// another. [`MetricsBuilder::emit`] drains the buffer so the builder can be
/// reused by the next cycle.
#[derive(Debug, Default)]
pub struct MetricsBuilder {
    settings: MetricsSettings,
    buffer: Vec<MetricDataPoint>,
}

impl MetricsBuilder {
    pub fn new(settings: MetricsSettings) -> Self {
        Self {
            settings,
            buffer: Vec::new(),
        }
    }

    /// Number of datapoints recorded since the last emit.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn record_splunk_license_index_usage_data_point(
        &mut self,
        ts: DateTime<Utc>,
        value: i64,
        index: &str,
    ) {
        self.record(Metric::SplunkLicenseIndexUsage, ts, MetricValue::Int(value), index);
    }

    pub fn record_splunk_indexer_throughput_data_point(
        &mut self,
        ts: DateTime<Utc>,
        value: f64,
        status: &str,
    ) {
        self.record(Metric::SplunkIndexerThroughput, ts, MetricValue::Double(value), status);
    }

    fn record(&mut self, metric: Metric, ts: DateTime<Utc>, value: MetricValue, attribute: &str) {
        if !self.settings.is_enabled(metric) {
            return;
        }

        let mut labels = HashMap::with_capacity(1);
        labels.insert(metric.attribute().to_string(), attribute.to_string());

        self.buffer.push(MetricDataPoint {
            timestamp: ts,
            metric_name: metric.name().to_string(),
            unit: metric.unit().to_string(),
            value,
            labels,
        });
    }

    /// Drops anything left over from a cycle that never reached [`emit`].
    ///
    /// [`emit`]: MetricsBuilder::emit
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(count = self.buffer.len(), "Discarding unemitted datapoints");
            self.buffer.clear();
        }
    }

    /// Hands out everything recorded so far as an immutable snapshot.
    pub fn emit(&mut self) -> MetricSnapshot {
        let data_points = std::mem::take(&mut self.buffer);
        tracing::debug!(count = data_points.len(), "Emitting metric snapshot");
        MetricSnapshot::new(Utc::now(), data_points)
    }
}
