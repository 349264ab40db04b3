use anyhow::Context;
use oxsplunk_scraper::ScraperConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ReceiverConfig {
    #[serde(flatten)]
    pub scraper: ScraperConfig,
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,
}

fn default_collection_interval() -> u64 {
    600
}

impl ReceiverConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("Failed to parse {path}"))?;
        config.scraper.validate()?;
        if config.collection_interval_secs == 0 {
            anyhow::bail!("collection_interval_secs must be greater than zero");
        }
        Ok(config)
    }
}
