//! Shared metric types for the oxsplunk collector.
//!
//! [`metrics::MetricsBuilder`] is the emitter every scrape task writes into;
//! [`types::MetricSnapshot`] is what it hands to the exporter once per cycle.

pub mod metrics;
pub mod types;
