//! Scrape task definitions, one per monitored KPI.
//!
//! A task says where its data comes from (a search or a plain endpoint),
//! which fields it understands, and which builder method records the values.
//! Adding a KPI means adding a constructor here and listing it in
//! [`ScrapeTask::defaults`].

use crate::decode::{decode_indexer_throughput, EndpointRecord, FieldValue};
use crate::error::{ScrapeError, ScrapeErrors};
use crate::fetch::EndpointDecoder;
use chrono::{DateTime, Utc};
use oxsplunk_common::metrics::{Metric, MetricsBuilder, MetricsSettings};

pub const LICENSE_INDEX_USAGE_SEARCH: &str = concat!(
    "search index=_internal source=*license_usage.log type=\"Usage\"",
    "| fields idx, b",
    "| eval indexname = if(len(idx)=0 OR isnull(idx),\"(UNKNOWN)\",idx)",
    "| stats sum(b) as b by indexname",
    "| eval By=round(b, 9)",
    "| fields indexname, By"
);

pub const INDEXER_THROUGHPUT_ENDPOINT: &str = "/services/server/introspection/indexer?output_mode=json";

/// Records one value against one dimension.
pub type RecordFn = fn(&mut MetricsBuilder, DateTime<Utc>, f64, &str);

/// Per-cycle view of a task's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTaskConfig {
    pub enabled: bool,
    pub query_or_endpoint: String,
}

/// Where a task's data comes from and how its payload is shaped.
#[derive(Debug, Clone, Copy)]
pub enum TaskSource {
    /// A search job; rows are walked for `dimension_field` and `value_field`.
    Search {
        dimension_field: &'static str,
        value_field: &'static str,
    },
    /// A plain endpoint; each decoded entry's value is multiplied by `scale`.
    Endpoint { decode: EndpointDecoder, scale: f64 },
}

#[derive(Debug, Clone)]
pub struct ScrapeTask {
    pub name: &'static str,
    pub metric: Metric,
    pub config: ScrapeTaskConfig,
    pub source: TaskSource,
    record: RecordFn,
}

impl ScrapeTask {
    pub fn search(
        name: &'static str,
        metric: Metric,
        config: ScrapeTaskConfig,
        dimension_field: &'static str,
        value_field: &'static str,
        record: RecordFn,
    ) -> Self {
        Self {
            name,
            metric,
            config,
            source: TaskSource::Search {
                dimension_field,
                value_field,
            },
            record,
        }
    }

    pub fn endpoint(
        name: &'static str,
        metric: Metric,
        config: ScrapeTaskConfig,
        decode: EndpointDecoder,
        scale: f64,
        record: RecordFn,
    ) -> Self {
        Self {
            name,
            metric,
            config,
            source: TaskSource::Endpoint { decode, scale },
            record,
        }
    }

    /// License usage per index, from the `license_usage.log` search.
    /// Values are recorded as whole bytes.
    pub fn license_index_usage(settings: &MetricsSettings) -> Self {
        Self::search(
            "license_index_usage",
            Metric::SplunkLicenseIndexUsage,
            ScrapeTaskConfig {
                enabled: settings.is_enabled(Metric::SplunkLicenseIndexUsage),
                query_or_endpoint: LICENSE_INDEX_USAGE_SEARCH.to_string(),
            },
            "indexname",
            "By",
            |mb, ts, value, index| {
                mb.record_splunk_license_index_usage_data_point(ts, value as i64, index)
            },
        )
    }

    /// Indexer throughput per status. Splunk reports KB/s; the metric is B/s.
    pub fn indexer_throughput(settings: &MetricsSettings) -> Self {
        Self::endpoint(
            "indexer_throughput",
            Metric::SplunkIndexerThroughput,
            ScrapeTaskConfig {
                enabled: settings.is_enabled(Metric::SplunkIndexerThroughput),
                query_or_endpoint: INDEXER_THROUGHPUT_ENDPOINT.to_string(),
            },
            decode_indexer_throughput,
            1000.0,
            |mb, ts, value, status| mb.record_splunk_indexer_throughput_data_point(ts, value, status),
        )
    }

    /// Every known task, in the order a cycle runs them.
    pub fn defaults(settings: &MetricsSettings) -> Vec<Self> {
        vec![
            Self::license_index_usage(settings),
            Self::indexer_throughput(settings),
        ]
    }

    /// Walks search result fields once.
    ///
    /// The dimension field sets the dimension for the value fields that
    /// follow it; each value field yields one datapoint. Unrecognized names
    /// are skipped. A value that does not parse, or parses to NaN or an
    /// infinity, is reported and the walk carries on.
    pub fn record_fields(
        &self,
        fields: &[FieldValue],
        ts: DateTime<Utc>,
        mb: &mut MetricsBuilder,
        errs: &mut ScrapeErrors,
    ) -> usize {
        let TaskSource::Search {
            dimension_field,
            value_field,
        } = self.source
        else {
            return 0;
        };

        let mut recorded = 0;
        let mut dimension: &str = "";
        for field in fields {
            if field.name == dimension_field {
                dimension = field.value.as_str();
            } else if field.name == value_field {
                match field.value.trim().parse::<f64>() {
                    Ok(v) if v.is_finite() => {
                        (self.record)(mb, ts, v, dimension);
                        recorded += 1;
                    }
                    parsed => errs.add(
                        self.name,
                        ScrapeError::FieldConversion {
                            field: field.name.clone(),
                            value: field.value.clone(),
                            source: parsed.err(),
                        },
                    ),
                }
            }
        }
        recorded
    }

    /// Maps decoded endpoint entries 1:1 onto datapoints.
    pub fn record_entries(
        &self,
        record: &EndpointRecord,
        ts: DateTime<Utc>,
        mb: &mut MetricsBuilder,
    ) -> usize {
        let TaskSource::Endpoint { scale, .. } = self.source else {
            return 0;
        };

        for entry in &record.entries {
            (self.record)(mb, ts, scale * entry.metric_value, &entry.dimension);
        }
        record.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::EndpointEntry;
    use oxsplunk_common::types::MetricValue;

    #[test]
    fn test_defaults_follow_metric_settings() {
        let mut settings = MetricsSettings::default();
        settings.splunk_indexer_throughput.enabled = false;

        let tasks = ScrapeTask::defaults(&settings);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].name, "license_index_usage");
        assert!(tasks[0].config.enabled);
        assert!(tasks[0].config.query_or_endpoint.starts_with("search index=_internal"));
        assert_eq!(tasks[1].name, "indexer_throughput");
        assert!(!tasks[1].config.enabled);
        assert_eq!(tasks[1].config.query_or_endpoint, INDEXER_THROUGHPUT_ENDPOINT);
    }

    #[test]
    fn test_record_fields_truncates_license_usage() {
        let task = ScrapeTask::license_index_usage(&MetricsSettings::default());
        let mut mb = MetricsBuilder::new(MetricsSettings::default());
        let mut errs = ScrapeErrors::new();
        let fields = vec![
            FieldValue::new("indexname", "main"),
            FieldValue::new("By", "42.9"),
            FieldValue::new("indexname", "_audit"),
            FieldValue::new("extra_column", "ignored"),
            FieldValue::new("By", "7"),
        ];

        let recorded = task.record_fields(&fields, Utc::now(), &mut mb, &mut errs);

        assert_eq!(recorded, 2);
        assert!(errs.is_empty());
        let snapshot = mb.emit();
        let points = snapshot.data_points();
        assert_eq!(points[0].value, MetricValue::Int(42));
        assert_eq!(points[0].labels["index"], "main");
        assert_eq!(points[1].value, MetricValue::Int(7));
        assert_eq!(points[1].labels["index"], "_audit");
    }

    #[test]
    fn test_bad_value_is_reported_and_walk_continues() {
        let task = ScrapeTask::license_index_usage(&MetricsSettings::default());
        let mut mb = MetricsBuilder::new(MetricsSettings::default());
        let mut errs = ScrapeErrors::new();
        let fields = vec![
            FieldValue::new("indexname", "main"),
            FieldValue::new("By", "lots"),
            FieldValue::new("indexname", "summary"),
            FieldValue::new("By", "10"),
        ];

        let recorded = task.record_fields(&fields, Utc::now(), &mut mb, &mut errs);

        assert_eq!(recorded, 1);
        assert_eq!(errs.len(), 1);
        let failure = errs.iter().next().unwrap();
        assert_eq!(failure.task, "license_index_usage");
        assert!(matches!(failure.error, ScrapeError::FieldConversion { .. }));
        assert_eq!(mb.emit().data_points()[0].labels["index"], "summary");
    }

    #[test]
    fn test_non_finite_values_are_reported() {
        let task = ScrapeTask::license_index_usage(&MetricsSettings::default());
        let mut mb = MetricsBuilder::new(MetricsSettings::default());
        let mut errs = ScrapeErrors::new();
        let fields = vec![
            FieldValue::new("indexname", "a"),
            FieldValue::new("By", "NaN"),
            FieldValue::new("indexname", "b"),
            FieldValue::new("By", "inf"),
            FieldValue::new("indexname", "c"),
            FieldValue::new("By", "1e400"),
            FieldValue::new("indexname", "d"),
            FieldValue::new("By", "5"),
        ];

        let recorded = task.record_fields(&fields, Utc::now(), &mut mb, &mut errs);

        assert_eq!(recorded, 1);
        assert_eq!(errs.len(), 3);
        for failure in errs.iter() {
            assert!(matches!(
                failure.error,
                ScrapeError::FieldConversion { source: None, .. }
            ));
        }
        let snapshot = mb.emit();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.data_points()[0].value, MetricValue::Int(5));
        assert_eq!(snapshot.data_points()[0].labels["index"], "d");
    }

    #[test]
    fn test_record_entries_scales_to_bytes() {
        let task = ScrapeTask::indexer_throughput(&MetricsSettings::default());
        let mut mb = MetricsBuilder::new(MetricsSettings::default());
        let record = EndpointRecord {
            entries: vec![EndpointEntry {
                metric_value: 1.5,
                dimension: "ok".to_string(),
            }],
        };

        assert_eq!(task.record_entries(&record, Utc::now(), &mut mb), 1);
        let snapshot = mb.emit();
        assert_eq!(snapshot.data_points()[0].value, MetricValue::Double(1500.0));
        assert_eq!(snapshot.data_points()[0].labels["status"], "ok");
    }

    #[test]
    fn test_mapping_ignores_payload_of_the_other_kind() {
        let search = ScrapeTask::license_index_usage(&MetricsSettings::default());
        let endpoint = ScrapeTask::indexer_throughput(&MetricsSettings::default());
        let mut mb = MetricsBuilder::new(MetricsSettings::default());
        let mut errs = ScrapeErrors::new();

        let record = EndpointRecord {
            entries: vec![EndpointEntry {
                metric_value: 1.0,
                dimension: "ok".to_string(),
            }],
        };
        assert_eq!(search.record_entries(&record, Utc::now(), &mut mb), 0);
        let fields = vec![FieldValue::new("By", "1")];
        assert_eq!(endpoint.record_fields(&fields, Utc::now(), &mut mb, &mut errs), 0);
        assert_eq!(mb.pending(), 0);
    }
}
