use crate::client::{SplunkClient, SplunkTransport};
use crate::config::ScraperConfig;
use crate::error::{PartialScrapeError, ScrapeErrors, TransportError};
use crate::fetch::EndpointFetcher;
use crate::job::{SearchJob, SearchPoller};
use crate::tasks::{ScrapeTask, TaskSource};
use chrono::{DateTime, Utc};
use oxsplunk_common::metrics::{MetricsBuilder, MetricsSettings};
use oxsplunk_common::types::MetricSnapshot;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Runs every scrape task once per cycle against a single Splunk instance.
///
/// The transport and the metrics builder live as long as the scraper; all
/// job and decode state is created and dropped inside each task.
pub struct SplunkScraper {
    transport: Arc<dyn SplunkTransport>,
    tasks: Vec<ScrapeTask>,
    metrics: MetricsBuilder,
    max_search_wait: Duration,
}

impl SplunkScraper {
    pub fn new(
        transport: Arc<dyn SplunkTransport>,
        settings: MetricsSettings,
        max_search_wait: Duration,
    ) -> Self {
        Self {
            transport,
            tasks: ScrapeTask::defaults(&settings),
            metrics: MetricsBuilder::new(settings),
            max_search_wait,
        }
    }

    /// Build a scraper talking to the instance described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be built.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, TransportError> {
        let client = SplunkClient::new(config)?;
        Ok(Self::new(
            Arc::new(client),
            config.metrics.clone(),
            config.max_search_wait(),
        ))
    }

    /// Replace the task list, e.g. to run a single task.
    pub fn with_tasks(mut self, tasks: Vec<ScrapeTask>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn tasks(&self) -> &[ScrapeTask] {
        &self.tasks
    }

    /// Runs one collection cycle.
    ///
    /// Every enabled task runs in order and reports its own failures; none of
    /// them can stop the others. The snapshot holds whatever was recorded,
    /// the second value lists what failed.
    pub async fn scrape(
        &mut self,
        cancel: &CancellationToken,
    ) -> (MetricSnapshot, Result<(), PartialScrapeError>) {
        let Self {
            transport,
            tasks,
            metrics,
            max_search_wait,
        } = self;

        metrics.reset();
        let started = Instant::now();
        let now = Utc::now();
        let mut errs = ScrapeErrors::new();

        for task in tasks.iter() {
            // Disabled tasks must not touch the API.
            if !task.config.enabled {
                tracing::debug!(task = task.name, "Scrape task disabled, skipping");
                continue;
            }

            run_task(
                &**transport,
                task,
                *max_search_wait,
                now,
                metrics,
                &mut errs,
                cancel,
            )
            .await;
        }

        let snapshot = metrics.emit();
        tracing::info!(
            datapoints = snapshot.len(),
            failures = errs.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape cycle finished"
        );

        (snapshot, errs.combine())
    }
}

async fn run_task(
    transport: &dyn SplunkTransport,
    task: &ScrapeTask,
    max_search_wait: Duration,
    now: DateTime<Utc>,
    metrics: &mut MetricsBuilder,
    errs: &mut ScrapeErrors,
    cancel: &CancellationToken,
) {
    match task.source {
        TaskSource::Search { .. } => {
            let mut job = SearchJob::new(task.config.query_or_endpoint.as_str());
            let poller = SearchPoller::new(transport, max_search_wait);
            if let Err(e) = poller.run(&mut job, cancel).await {
                errs.add(task.name, e);
                return;
            }

            let mut recorded = 0;
            job.parse(|fields| recorded = task.record_fields(fields, now, metrics, errs));
            tracing::debug!(
                task = task.name,
                job_id = job.job_id.as_deref().unwrap_or("-"),
                recorded,
                "Search task complete"
            );
        }
        TaskSource::Endpoint { decode, .. } => {
            let fetcher = EndpointFetcher::new(transport);
            match fetcher
                .fetch(&task.config.query_or_endpoint, decode, cancel)
                .await
            {
                Ok(Some(record)) => {
                    let recorded = task.record_entries(&record, now, metrics);
                    tracing::debug!(task = task.name, recorded, "Endpoint task complete");
                }
                Ok(None) => {
                    tracing::debug!(task = task.name, "Endpoint returned no content");
                }
                Err(e) => errs.add(task.name, e),
            }
        }
    }
}
