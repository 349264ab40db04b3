//! Polling scrape engine for the Splunk Enterprise management API.
//!
//! One [`scraper::SplunkScraper::scrape`] call is one collection cycle. Each
//! [`tasks::ScrapeTask`] either runs a search job (submit, poll every two
//! seconds until results are ready or the wait budget runs out) or fetches a
//! plain JSON endpoint, then records its values into the shared
//! [`oxsplunk_common::metrics::MetricsBuilder`]. Task failures are collected
//! into [`error::ScrapeErrors`] and never stop the rest of the cycle.

pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod job;
pub mod scraper;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use client::{RawResponse, SplunkClient, SplunkRequest, SplunkTransport};
pub use config::ScraperConfig;
pub use error::{PartialScrapeError, ScrapeError, ScrapeErrors};
pub use scraper::SplunkScraper;
pub use tasks::{ScrapeTask, ScrapeTaskConfig};
