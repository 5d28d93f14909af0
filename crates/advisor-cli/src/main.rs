use std::sync::Arc;

use analysis_core::NarrativeGenerator;
use analysis_orchestrator::{AdvisorConfig, AdvisorReport, AnalysisOrchestrator};
use anyhow::{Context, Result};
use clap::Parser;
use narrative_client::{GeminiNarrativeClient, NarrativeConfig};
use sentiment_analysis::NewsSentimentProvider;
use tracing_subscriber::EnvFilter;
use yahoo_client::YahooFinanceClient;

const DEFAULT_FILTER: &str = "stock_advisor=info,analysis_orchestrator=info,yahoo_client=warn";

#[derive(Debug, Parser)]
#[command(name = "stock-advisor", about = "Rank stocks and print a recommendation as JSON")]
struct Args {
    /// Ticker symbols to compare, e.g. AAPL MSFT NVDA
    #[arg(long, num_args = 1.., conflicts_with = "query")]
    symbols: Vec<String>,

    /// Free text naming companies or $TICKERS
    #[arg(long)]
    query: Option<String>,

    /// Positional ticker symbols
    #[arg(conflicts_with = "query")]
    positional: Vec<String>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

fn init_tracing() {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn narrative_from_env() -> Option<Arc<dyn NarrativeGenerator>> {
    let config = NarrativeConfig::from_env()?;
    match GeminiNarrativeClient::new(config) {
        Ok(client) => {
            tracing::info!("Narrative enrichment enabled ({})", client.model());
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("Narrative enrichment disabled: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = AdvisorConfig::from_env().context("Failed to load advisor configuration")?;

    let yahoo = Arc::new(YahooFinanceClient::new(config.yahoo_rate_limit));
    let sentiment = Arc::new(NewsSentimentProvider::new(yahoo.clone(), config.max_headlines));

    let mut orchestrator = AnalysisOrchestrator::new(config, yahoo, sentiment);
    if let Some(narrative) = narrative_from_env() {
        orchestrator = orchestrator.with_narrative(narrative);
    }

    let report: AdvisorReport = match args.query.as_deref() {
        Some(query) => orchestrator.run_query(query).await?,
        None => {
            let symbols: Vec<String> = args.symbols.into_iter().chain(args.positional).collect();
            orchestrator.run(symbols.as_slice()).await?
        }
    };

    let output = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{}", output);

    tracing::info!(
        "Best pick {} among {} analyzed",
        report.comparison.best_symbol,
        report.total_analyzed
    );
    Ok(())
}
