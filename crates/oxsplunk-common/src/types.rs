use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric value of a datapoint. The metric definition decides which variant
/// is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Double(f64),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{v}"),
            MetricValue::Double(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDataPoint {
    pub timestamp: DateTime<Utc>,
    pub metric_name: String,
    pub unit: String,
    pub value: MetricValue,
    pub labels: HashMap<String, String>,
}

/// The datapoints recorded during one collection cycle.
///
/// A snapshot is produced once by [`crate::metrics::MetricsBuilder::emit`]
/// and is read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    emitted_at: DateTime<Utc>,
    data_points: Vec<MetricDataPoint>,
}

impl MetricSnapshot {
    pub(crate) fn new(emitted_at: DateTime<Utc>, data_points: Vec<MetricDataPoint>) -> Self {
        Self {
            emitted_at,
            data_points,
        }
    }

    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.emitted_at
    }

    pub fn data_points(&self) -> &[MetricDataPoint] {
        &self.data_points
    }

    pub fn len(&self) -> usize {
        self.data_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty()
    }

    /// Datapoints recorded for a single metric, in recording order.
    pub fn by_metric<'a>(&'a self, metric_name: &'a str) -> impl Iterator<Item = &'a MetricDataPoint> {
        self.data_points
            .iter()
            .filter(move |dp| dp.metric_name == metric_name)
    }
}

/// Format labels map into a human-readable string.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use oxsplunk_common::types::format_labels;
///
/// let mut labels = HashMap::new();
/// labels.insert("index".to_string(), "main".to_string());
/// labels.insert("status".to_string(), "normal".to_string());
/// assert_eq!(format_labels(&labels), "index=main, status=normal");
/// ```
pub fn format_labels(labels: &HashMap<String, String>) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    pairs.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_value_serializes_untagged() {
        let int = serde_json::to_value(MetricValue::Int(42)).unwrap();
        let double = serde_json::to_value(MetricValue::Double(1.5)).unwrap();
        assert_eq!(int, serde_json::json!(42));
        assert_eq!(double, serde_json::json!(1.5));
    }

    #[test]
    fn test_format_labels_empty() {
        assert_eq!(format_labels(&HashMap::new()), "");
    }
}
