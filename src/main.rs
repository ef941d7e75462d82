//! News Sentiment Pipeline — Binary Entrypoint
//! Discovers raw article JSON records, runs the batch, and writes the
//! timestamped CSV artifact plus a summary report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_sentiment_pipeline::batch::BatchAggregator;
use news_sentiment_pipeline::config::PipelineConfig;
use news_sentiment_pipeline::gateway::build_gateway;
use news_sentiment_pipeline::process::RawArticle;
use news_sentiment_pipeline::sink::tracing_sink;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op elsewhere. Enables OPENAI_API_KEY and
    // PIPELINE_CONFIG_PATH without exporting them by hand.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = PipelineConfig::load_default()?;
    run(&config).await
}

async fn run(config: &PipelineConfig) -> Result<()> {
    let files = discover_input_files(&config.input_dir)?;
    info!(count = files.len(), dir = %config.input_dir.display(), "discovered input files");
    if files.is_empty() {
        bail!(
            "no input files found under {}",
            config.input_dir.display()
        );
    }

    let articles = load_articles(&files);
    let gateway = build_gateway(&config.gateway)?;
    info!(provider = gateway.name(), "gateway ready");

    let aggregator = BatchAggregator::new(gateway, tracing_sink());
    let table = aggregator.run(&articles).await?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let artifact = config.output_dir.join(format!("sentiment_{stamp}.csv"));
    table.write_csv(&artifact)?;

    info!("\n{}", table.summary());
    info!(path = %artifact.display(), rows = table.len(), "artifact written");
    Ok(())
}

/// All `*.json` files directly under `dir`, sorted for a deterministic
/// processing order.
fn discover_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("reading input directory {}", dir.display()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Read each file as one record or an array of records. Unreadable files
/// are logged and skipped; one bad file never aborts the batch.
fn load_articles(files: &[PathBuf]) -> Vec<RawArticle> {
    let mut articles = Vec::new();
    for path in files {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed JSON");
                continue;
            }
        };
        let records = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };
        for record in records {
            match serde_json::from_value::<RawArticle>(record) {
                Ok(a) => articles.push(a),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping record"),
            }
        }
    }
    articles
}
