//! Harvest the news listing into a CSV file.
//! Run with: cargo run --bin econews-harvest -- --output news.csv

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use econews_agent::dataset::{ArticleTable, EXPORT_FILE_NAME};
use econews_agent::scraping::{HarvestConfig, NewsHarvester};

#[derive(Parser, Debug)]
#[command(name = "econews-harvest", about = "Scrape the news listing into a CSV file")]
struct Args {
    /// Output file
    #[arg(long, short, value_name = "FILE", default_value = EXPORT_FILE_NAME)]
    output: PathBuf,

    /// Listing page to crawl instead of the default
    #[arg(long, value_name = "URL")]
    listing_url: Option<String>,

    /// Per-request timeout in seconds (none by default)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let mut config = HarvestConfig::default();
    if let Some(url) = args.listing_url {
        config = config.with_listing_url(url);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let harvester = NewsHarvester::new(config).context("failed to build harvester")?;
    let records = harvester.harvest().await.context("harvest failed")?;

    let csv = ArticleTable::from_records(&records)
        .to_csv_bytes()
        .context("failed to encode CSV")?;
    tokio::fs::write(&args.output, csv)
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(articles = records.len(), path = %args.output.display(), "CSV written");
    Ok(())
}
