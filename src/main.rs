use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stock_scout::analysis_core::MarketAnalyzer;
use stock_scout::config::AnalyzerConfig;
use stock_scout::data::{CsvFileSource, PriceHistorySource, StooqSource};
use stock_scout::report::render_text;
use stock_scout::sentiment::{NewsApiClient, SentimentAnalyzer, SentimentBackend};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Symbols to analyze (comma-separated)
    #[arg(short, long, default_value = "AAPL")]
    symbols: String,

    /// Daily bars of history to request per symbol
    #[arg(short, long, default_value = "300")]
    lookback: usize,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Directory of local SYMBOL.csv bar files; omits the network source
    #[arg(long)]
    csv_dir: Option<String>,

    /// NewsAPI key for live headlines
    #[arg(long, env = "NEWS_API_KEY")]
    news_api_key: Option<String>,

    /// Remote sentiment classification endpoint; falls back to the built-in
    /// lexicon when unset
    #[arg(long, env = "SENTIMENT_ENDPOINT")]
    sentiment_endpoint: Option<String>,

    /// Disable sentiment scoring entirely
    #[arg(long)]
    no_sentiment: bool,

    /// Account equity in dollars
    #[arg(long, default_value = "100000")]
    equity: f64,

    /// Fraction of equity risked per trade
    #[arg(long, default_value = "0.01")]
    risk_per_trade: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = AnalyzerConfig::default();
    config.lookback_days = args.lookback;
    config.risk.equity = args.equity;
    config.risk.risk_per_trade = args.risk_per_trade;

    let history: Arc<dyn PriceHistorySource> = match &args.csv_dir {
        Some(dir) => Arc::new(CsvFileSource::new(dir)),
        None => Arc::new(StooqSource::new()),
    };

    let backend = if args.no_sentiment {
        SentimentBackend::Disabled
    } else {
        match args.sentiment_endpoint {
            Some(endpoint) => SentimentBackend::Remote { endpoint },
            None => SentimentBackend::Lexicon,
        }
    };

    let analyzer = Arc::new(MarketAnalyzer::new(
        config,
        history,
        Arc::new(NewsApiClient::new(args.news_api_key)),
        SentimentAnalyzer::new(backend),
    ));

    let symbols: Vec<String> = args
        .symbols
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    info!("analyzing {} symbol(s)", symbols.len());

    let tasks = symbols.iter().map(|symbol| {
        let analyzer = analyzer.clone();
        let symbol = symbol.clone();
        async move { (symbol.clone(), analyzer.analyze(&symbol).await) }
    });

    for (symbol, result) in futures::future::join_all(tasks).await {
        match result {
            Ok(Some(report)) => {
                if args.format == "json" {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("{}\n", render_text(&report));
                }
            }
            Ok(None) => info!("{symbol}: no price history available"),
            Err(e) => error!("{symbol}: analysis failed: {e:#}"),
        }
    }

    Ok(())
}
