mod config;

use anyhow::{Context, Result};
use oxsplunk_common::types::{format_labels, MetricSnapshot};
use oxsplunk_scraper::SplunkScraper;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn export(snapshot: &MetricSnapshot) {
    for dp in snapshot.data_points() {
        tracing::debug!(
            metric = %dp.metric_name,
            value = %dp.value,
            unit = %dp.unit,
            labels = %format_labels(&dp.labels),
            "datapoint"
        );
    }

    match serde_json::to_string(snapshot) {
        Ok(line) => tracing::info!(target: "oxsplunk::export", "{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize snapshot"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("oxsplunk=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/receiver.toml".to_string());

    let config = config::ReceiverConfig::load(&config_path)?;
    tracing::info!(endpoint = %config.scraper.endpoint, "oxsplunk-receiver starting");

    let mut scraper =
        SplunkScraper::from_config(&config.scraper).context("Failed to build Splunk client")?;

    for task in scraper.tasks() {
        tracing::info!(
            task = task.name,
            metric = %task.metric,
            description = task.metric.description(),
            enabled = task.config.enabled,
            "Scrape task registered"
        );
    }

    let shutdown = CancellationToken::new();
    let mut tick = interval(Duration::from_secs(config.collection_interval_secs));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = config.collection_interval_secs,
        max_search_wait_secs = config.scraper.max_search_wait_secs,
        "Starting collection loop"
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let cycle = shutdown.child_token();
                let scrape = scraper.scrape(&cycle);
                tokio::pin!(scrape);

                let (snapshot, result) = tokio::select! {
                    out = &mut scrape => out,
                    _ = signal::ctrl_c() => {
                        tracing::info!("Shutdown requested, cancelling in-flight scrape");
                        shutdown.cancel();
                        scrape.await
                    }
                };

                if let Err(e) = &result {
                    tracing::warn!(failures = e.len(), error = %e, "Scrape cycle finished with failures");
                }
                export(&snapshot);

                if shutdown.is_cancelled() {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    Ok(())
}
