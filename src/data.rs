//! Price history sources
//!
//! The analyzer only sees the `PriceHistorySource` trait: an ordered,
//! ascending sequence of daily bars for a symbol. A source that fails
//! returns an empty sequence after logging; retries are its callers'
//! business, not ours.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::analysis_core::bars::Bar;

#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// Fetch up to `days` daily bars, ascending by timestamp. Empty on
    /// failure.
    async fn fetch_history(&self, symbol: &str, days: usize) -> Result<Vec<Bar>>;
}

/// One row of the Date,Open,High,Low,Close,Volume layout used by stooq
/// downloads and local files alike.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume", default)]
    volume: Option<f64>,
}

impl CsvRow {
    fn into_bar(self) -> Bar {
        Bar {
            timestamp: self.date.and_time(NaiveTime::MIN).and_utc(),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.unwrap_or(0.0),
        }
    }
}

/// Parse a daily-bar CSV payload, skipping malformed rows, and return the
/// last `days` bars sorted ascending.
fn parse_daily_csv(payload: &[u8], days: usize) -> Vec<Bar> {
    let mut reader = csv::Reader::from_reader(payload);
    let mut bars: Vec<Bar> = reader
        .deserialize::<CsvRow>()
        .filter_map(|row| match row {
            Ok(row) => Some(row.into_bar()),
            Err(e) => {
                debug!("skipping malformed bar row: {e}");
                None
            }
        })
        .collect();

    bars.sort_by_key(|b| b.timestamp);
    if bars.len() > days {
        bars.drain(..bars.len() - days);
    }
    bars
}

/// Free end-of-day data from stooq.com.
pub struct StooqSource {
    client: reqwest::Client,
}

impl StooqSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Plain US tickers need the `.US` suffix; indices (`^SPX`) and already
    /// qualified symbols pass through.
    fn stooq_symbol(symbol: &str) -> String {
        let upper = symbol.to_uppercase();
        if upper.ends_with(".US") || upper.starts_with('^') {
            upper
        } else {
            format!("{upper}.US")
        }
    }
}

impl Default for StooqSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceHistorySource for StooqSource {
    async fn fetch_history(&self, symbol: &str, days: usize) -> Result<Vec<Bar>> {
        let url = format!(
            "https://stooq.com/q/d/l/?s={}&i=d",
            Self::stooq_symbol(symbol)
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("stooq fetch failed for {symbol}: {e}");
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            warn!("stooq returned {} for {symbol}", response.status());
            return Ok(Vec::new());
        }

        let payload = response
            .bytes()
            .await
            .with_context(|| format!("reading stooq payload for {symbol}"))?;

        let bars = parse_daily_csv(&payload, days);
        debug!("fetched {} bars for {symbol} from stooq", bars.len());
        Ok(bars)
    }
}

/// Local `{dir}/{SYMBOL}.csv` files in the same daily layout, for offline
/// runs and fixtures.
pub struct CsvFileSource {
    dir: PathBuf,
}

impl CsvFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PriceHistorySource for CsvFileSource {
    async fn fetch_history(&self, symbol: &str, days: usize) -> Result<Vec<Bar>> {
        let path = self.dir.join(format!("{}.csv", symbol.to_uppercase()));
        if !path.exists() {
            warn!("no bar file at {}", path.display());
            return Ok(Vec::new());
        }

        let payload = std::fs::read(&path)
            .with_context(|| format!("reading bar file {}", path.display()))?;
        Ok(parse_daily_csv(&payload, days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Date,Open,High,Low,Close,Volume\n\
        2024-01-03,101.0,103.0,100.0,102.0,1200\n\
        2024-01-02,100.0,102.0,99.0,101.0,1000\n\
        2024-01-04,102.0,104.0,101.0,103.0,1400\n";

    #[test]
    fn parses_and_sorts_ascending() {
        let bars = parse_daily_csv(SAMPLE.as_bytes(), 300);
        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[2].volume, 1400.0);
    }

    #[test]
    fn truncates_to_requested_days_keeping_latest() {
        let bars = parse_daily_csv(SAMPLE.as_bytes(), 2);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 102.0);
        assert_eq!(bars[1].close, 103.0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let payload = "Date,Open,High,Low,Close,Volume\n\
            2024-01-02,100.0,102.0,99.0,101.0,1000\n\
            not-a-date,x,y,z,w,v\n";
        let bars = parse_daily_csv(payload.as_bytes(), 300);
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let payload = "Date,Open,High,Low,Close,Volume\n\
            2024-01-02,100.0,102.0,99.0,101.0,\n";
        let bars = parse_daily_csv(payload.as_bytes(), 300);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn stooq_symbol_mapping() {
        assert_eq!(StooqSource::stooq_symbol("aapl"), "AAPL.US");
        assert_eq!(StooqSource::stooq_symbol("MSFT.US"), "MSFT.US");
        assert_eq!(StooqSource::stooq_symbol("^spx"), "^SPX");
    }

    #[tokio::test]
    async fn csv_source_missing_file_yields_empty() {
        let source = CsvFileSource::new("/nonexistent/dir");
        let bars = source.fetch_history("AAPL", 300).await.unwrap();
        assert!(bars.is_empty());
    }
}
