//! Analysis orchestrator
//!
//! Single entry point per symbol: fetch history, feed only the bars the
//! cached streaming engines have not seen, then recompute the derived layers
//! (patterns, regime, volume, sentiment, score, position, risk) from the
//! updated state and assemble the report.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::backtest::BacktestEngine;
use super::bars::Bar;
use super::cache::{AnalysisState, EngineHandles, LruCache};
use super::indicators::IndicatorEngine;
use super::patterns::PatternRecognizer;
use super::positioning::{Action, EntrySignal, PositionManager, TradeType};
use super::regime::{MarketRegime, RegimeClassifier};
use super::risk::{RiskManager, TradeDirection};
use super::scoring::ScoringEngine;
use super::swings::{SwingDetector, SwingPoint};
use super::volume::{VolumeAnalyzer, VolumeStatus, VolumeTrend};
use crate::config::AnalyzerConfig;
use crate::data::PriceHistorySource;
use crate::sentiment::{NewsSource, SentimentAnalyzer, SentimentTone};

/// Everything the analysis produced for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub recommendation: Action,
    pub trade_type: TradeType,
    pub confidence: f64,
    pub target: f64,
    pub stop_loss: f64,
    pub risk_reward: f64,
    pub confidence_interval_low: f64,
    pub confidence_interval_high: f64,
    pub patterns: Vec<String>,
    pub regime: MarketRegime,
    pub sentiment_summary: SentimentTone,
    pub sentiment_score: f64,
    pub rationale: String,
    pub entry_signal: EntrySignal,
    pub trend_strength: String,
    pub volume_status: VolumeStatus,
    pub volume_trend: VolumeTrend,
    pub position_size_shares: u64,
    pub position_size_pct: f64,
    pub backtest_win_rate: Option<f64>,
    pub backtest_avg_move: Option<f64>,
    pub swings: Vec<SwingPoint>,
    pub bars: Vec<Bar>,
}

pub struct MarketAnalyzer {
    config: AnalyzerConfig,
    history: Arc<dyn PriceHistorySource>,
    news: Arc<dyn NewsSource>,
    sentiment: SentimentAnalyzer,
    patterns: PatternRecognizer,
    volume: VolumeAnalyzer,
    regime: RegimeClassifier,
    scoring: ScoringEngine,
    positioning: PositionManager,
    risk: RiskManager,
    backtest: BacktestEngine,
    cache: Mutex<LruCache>,
    // One in-flight analysis per symbol; distinct symbols run in parallel.
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MarketAnalyzer {
    pub fn new(
        config: AnalyzerConfig,
        history: Arc<dyn PriceHistorySource>,
        news: Arc<dyn NewsSource>,
        sentiment: SentimentAnalyzer,
    ) -> Self {
        Self {
            patterns: PatternRecognizer::new(config.patterns.clone()),
            volume: VolumeAnalyzer::new(config.volume.clone()),
            regime: RegimeClassifier::new(config.regime.clone()),
            scoring: ScoringEngine::new(),
            positioning: PositionManager::new(config.bias_threshold),
            risk: RiskManager::new(config.risk.clone()),
            backtest: BacktestEngine::new(),
            cache: Mutex::new(LruCache::new(config.cache_capacity)),
            inflight: Mutex::new(HashMap::new()),
            history,
            news,
            sentiment,
            config,
        }
    }

    fn fresh_engines(&self) -> EngineHandles {
        EngineHandles {
            indicators: IndicatorEngine::new(&self.config.indicators),
            swings: SwingDetector::new(self.config.swing_threshold),
        }
    }

    fn symbol_lock(&self, symbol: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inflight.lock().expect("inflight map poisoned");
        map.entry(symbol.to_string()).or_default().clone()
    }

    /// A cloned view of the cached state for a symbol, promoting its
    /// recency. Mostly useful for diagnostics and tests.
    pub fn cached_state(&self, symbol: &str) -> Option<AnalysisState> {
        self.cache
            .lock()
            .expect("cache poisoned")
            .get(symbol)
            .cloned()
    }

    /// Analyze one symbol. `Ok(None)` means the price source produced
    /// nothing to report on; any cached state survives for later calls.
    pub async fn analyze(&self, symbol: &str) -> Result<Option<AnalysisReport>> {
        let lock = self.symbol_lock(symbol);
        let _guard = lock.lock().await;

        let bars = match self
            .history
            .fetch_history(symbol, self.config.lookback_days)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!("history fetch failed for {symbol}: {e:#}");
                Vec::new()
            }
        };

        if bars.is_empty() {
            info!("no price history for {symbol}, nothing to report");
            return Ok(None);
        }

        let cached = self.cache.lock().expect("cache poisoned").take(symbol);

        // Resume from the cached engines when the state is whole; anything
        // less rebuilds from the full history.
        let (mut engines, mut swings, mut snapshot, mut last_updated, new_bars) = match cached {
            Some(state) => match (state.engines, state.snapshot) {
                (Some(engines), Some(snapshot)) => {
                    let new_bars: Vec<Bar> = bars
                        .iter()
                        .filter(|b| b.timestamp > state.last_updated)
                        .cloned()
                        .collect();
                    debug!(
                        "{symbol}: resuming, {} of {} bars are new",
                        new_bars.len(),
                        bars.len()
                    );
                    (
                        engines,
                        state.swings,
                        Some(snapshot),
                        Some(state.last_updated),
                        new_bars,
                    )
                }
                _ => {
                    warn!("{symbol}: cached state incomplete, rebuilding from history");
                    (self.fresh_engines(), Vec::new(), None, None, bars.clone())
                }
            },
            None => {
                debug!("{symbol}: cache miss, processing {} bars", bars.len());
                (self.fresh_engines(), Vec::new(), None, None, bars.clone())
            }
        };

        for bar in &new_bars {
            // Ordering invariant: strictly newer bars only.
            if matches!(last_updated, Some(ts) if bar.timestamp <= ts) {
                warn!(
                    "{symbol}: dropping out-of-order bar at {}",
                    bar.timestamp
                );
                continue;
            }
            snapshot = Some(engines.indicators.update(bar));
            if let Some(swing) = engines.swings.update(bar) {
                swings.push(swing);
            }
            last_updated = Some(bar.timestamp);
        }

        let Some(snapshot) = snapshot else {
            // Unreachable with a non-empty history, but never panic over it.
            warn!("{symbol}: no indicator snapshot after processing");
            return Ok(None);
        };
        let last_updated = last_updated.unwrap_or_else(|| bars[bars.len() - 1].timestamp);
        let last = &bars[bars.len() - 1];

        let patterns = self.patterns.detect_patterns(&swings);
        let regime = self.regime.classify(&snapshot);

        let window = self.config.volume_average_window;
        let recent = &bars[bars.len().saturating_sub(window)..];
        let avg_volume = recent.iter().map(|b| b.volume).sum::<f64>() / recent.len() as f64;
        let volume_signal =
            self.volume
                .analyze(last, avg_volume, last.open, snapshot.atr.unwrap_or(1.0));

        let headlines = match self.news.fetch_headlines(symbol).await {
            Ok(headlines) => headlines,
            Err(e) => {
                warn!("headline fetch failed for {symbol}: {e:#}");
                Vec::new()
            }
        };
        let sentiment = self.sentiment.analyze(&headlines).await;

        let score = self.scoring.calculate_score(
            regime,
            &patterns,
            &volume_signal,
            sentiment.score,
            &snapshot,
        );
        let recommendation =
            self.positioning
                .recommend(score, regime, &snapshot, &patterns, last.close);

        // Risk always computes along some axis: the recommended side when
        // there is one, otherwise the regime-implied side at half confidence.
        let (direction, risk_confidence) = if recommendation.trade_type.is_long() {
            (TradeDirection::Long, recommendation.confidence)
        } else if recommendation.trade_type.is_short() {
            (TradeDirection::Short, recommendation.confidence)
        } else if regime == MarketRegime::BearTrend {
            (TradeDirection::Short, 0.5)
        } else {
            (TradeDirection::Long, 0.5)
        };

        let prev_bar = (bars.len() >= 2).then(|| &bars[bars.len() - 2]);
        let risk_profile = self.risk.calculate_risk(
            last.close,
            snapshot.atr.unwrap_or(0.0),
            direction,
            risk_confidence,
            &swings,
            prev_bar,
        );

        let stats = self.backtest.get_stats(&patterns, regime);

        let state = AnalysisState {
            symbol: symbol.to_string(),
            last_updated,
            snapshot: Some(snapshot.clone()),
            swings: swings.clone(),
            last_score: score,
            sentiment_score: Some(sentiment.score),
            last_price: Some(last.close),
            engines: Some(engines),
        };
        self.cache
            .lock()
            .expect("cache poisoned")
            .put(symbol.to_string(), state);

        let atr = snapshot.atr.unwrap_or(last.close * 0.02);
        let trend_strength = match snapshot.adx {
            Some(adx) => format!("ADX {adx:.1}"),
            None => "N/A".to_string(),
        };

        info!(
            "{symbol}: {} ({}) score {score:.2} regime {regime}",
            recommendation.action, recommendation.trade_type
        );

        Ok(Some(AnalysisReport {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            price: last.close,
            recommendation: recommendation.action,
            trade_type: recommendation.trade_type,
            confidence: recommendation.confidence,
            target: risk_profile.target,
            stop_loss: risk_profile.stop_loss,
            risk_reward: risk_profile.risk_reward,
            confidence_interval_low: last.close - 2.0 * atr,
            confidence_interval_high: last.close + 2.0 * atr,
            patterns,
            regime,
            sentiment_summary: sentiment.summary,
            sentiment_score: sentiment.score,
            rationale: recommendation.rationale,
            entry_signal: recommendation.entry_signal,
            trend_strength,
            volume_status: volume_signal.status,
            volume_trend: volume_signal.trend,
            position_size_shares: risk_profile.suggested_shares,
            position_size_pct: risk_profile.position_size_pct,
            backtest_win_rate: stats.map(|s| s.win_rate),
            backtest_avg_move: stats.map(|s| s.avg_move),
            swings,
            bars,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentBackend;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    struct SharedHistory {
        bars: Mutex<Vec<Bar>>,
    }

    impl SharedHistory {
        fn new(bars: Vec<Bar>) -> Arc<Self> {
            Arc::new(Self {
                bars: Mutex::new(bars),
            })
        }

        fn set(&self, bars: Vec<Bar>) {
            *self.bars.lock().unwrap() = bars;
        }
    }

    #[async_trait]
    impl PriceHistorySource for SharedHistory {
        async fn fetch_history(&self, _symbol: &str, _days: usize) -> Result<Vec<Bar>> {
            Ok(self.bars.lock().unwrap().clone())
        }
    }

    struct NoNews;

    #[async_trait]
    impl NewsSource for NoNews {
        async fn fetch_headlines(&self, _symbol: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct FailingNews;

    #[async_trait]
    impl NewsSource for FailingNews {
        async fn fetch_headlines(&self, _symbol: &str) -> Result<Vec<String>> {
            anyhow::bail!("news endpoint unreachable")
        }
    }

    fn day(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
    }

    /// A wavy uptrend long enough to warm every indicator and confirm a few
    /// swings.
    fn trending_bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.5;
                let wave = 6.0 * ((i as f64) * 0.35).sin();
                let close = base + wave;
                Bar {
                    timestamp: day(i as i64),
                    open: close - 0.5,
                    high: close + 1.5,
                    low: close - 1.5,
                    close,
                    volume: 1_000_000.0 + (i % 7) as f64 * 50_000.0,
                }
            })
            .collect()
    }

    fn analyzer(history: Arc<dyn PriceHistorySource>) -> MarketAnalyzer {
        MarketAnalyzer::new(
            AnalyzerConfig::default(),
            history,
            Arc::new(NoNews),
            SentimentAnalyzer::new(SentimentBackend::Disabled),
        )
    }

    #[tokio::test]
    async fn empty_history_reports_nothing() {
        let analyzer = analyzer(SharedHistory::new(Vec::new()));
        assert!(analyzer.analyze("AAPL").await.unwrap().is_none());
        assert!(analyzer.cached_state("AAPL").is_none());
    }

    #[tokio::test]
    async fn first_analysis_builds_state() {
        let analyzer = analyzer(SharedHistory::new(trending_bars(120)));
        let report = analyzer.analyze("AAPL").await.unwrap().unwrap();

        assert_eq!(report.symbol, "AAPL");
        assert_eq!(report.bars.len(), 120);
        assert!(report.confidence_interval_low < report.price);
        assert!(report.confidence_interval_high > report.price);

        let state = analyzer.cached_state("AAPL").unwrap();
        assert_eq!(state.last_updated, day(119));
        assert!(state.engines.is_some());
        assert!(state.snapshot.is_some());
        assert!(!state.swings.is_empty());
    }

    #[tokio::test]
    async fn rerun_without_new_bars_is_idempotent() {
        let analyzer = analyzer(SharedHistory::new(trending_bars(120)));
        let first = analyzer.analyze("AAPL").await.unwrap().unwrap();
        let second = analyzer.analyze("AAPL").await.unwrap().unwrap();

        assert_eq!(first.recommendation, second.recommendation);
        assert_eq!(first.trade_type, second.trade_type);
        assert_eq!(first.price, second.price);
        assert_eq!(first.stop_loss, second.stop_loss);
        assert_eq!(first.target, second.target);
        assert_eq!(first.patterns, second.patterns);
        assert_eq!(first.regime, second.regime);
        assert_eq!(first.swings, second.swings);
        assert_eq!(first.confidence, second.confidence);

        // No state drift from the zero-length incremental update.
        let state = analyzer.cached_state("AAPL").unwrap();
        assert_eq!(state.last_updated, day(119));
    }

    #[tokio::test]
    async fn chunked_feeds_match_one_full_feed() {
        let full = trending_bars(200);

        let source = SharedHistory::new(full[..120].to_vec());
        let incremental = analyzer(source.clone());
        incremental.analyze("AAPL").await.unwrap().unwrap();
        source.set(full.clone());
        incremental.analyze("AAPL").await.unwrap().unwrap();

        let oneshot = analyzer(SharedHistory::new(full));
        oneshot.analyze("AAPL").await.unwrap().unwrap();

        let a = incremental.cached_state("AAPL").unwrap();
        let b = oneshot.cached_state("AAPL").unwrap();
        assert_eq!(a.snapshot, b.snapshot);
        assert_eq!(a.swings, b.swings);
        assert_eq!(a.last_updated, b.last_updated);
    }

    #[tokio::test]
    async fn incomplete_cached_state_forces_rebuild() {
        let analyzer = analyzer(SharedHistory::new(trending_bars(120)));
        let first = analyzer.analyze("AAPL").await.unwrap().unwrap();

        // Strip the live engines out from under the entry.
        {
            let mut cache = analyzer.cache.lock().unwrap();
            let mut state = cache.take("AAPL").unwrap();
            state.engines = None;
            cache.put("AAPL".to_string(), state);
        }

        let second = analyzer.analyze("AAPL").await.unwrap().unwrap();
        assert_eq!(first.swings, second.swings);
        assert_eq!(first.stop_loss, second.stop_loss);
        assert_eq!(first.target, second.target);
        assert!(analyzer.cached_state("AAPL").unwrap().engines.is_some());
    }

    #[tokio::test]
    async fn empty_refetch_keeps_cached_state() {
        let source = SharedHistory::new(trending_bars(120));
        let analyzer = analyzer(source.clone());
        analyzer.analyze("AAPL").await.unwrap().unwrap();

        source.set(Vec::new());
        assert!(analyzer.analyze("AAPL").await.unwrap().is_none());
        assert!(analyzer.cached_state("AAPL").is_some());
    }

    #[tokio::test]
    async fn news_failure_degrades_to_neutral_sentiment() {
        let analyzer = MarketAnalyzer::new(
            AnalyzerConfig::default(),
            SharedHistory::new(trending_bars(120)),
            Arc::new(FailingNews),
            SentimentAnalyzer::new(SentimentBackend::Lexicon),
        );
        let report = analyzer.analyze("AAPL").await.unwrap().unwrap();
        assert_eq!(report.sentiment_score, 0.0);
        assert_eq!(report.sentiment_summary, SentimentTone::Neutral);
    }

    #[tokio::test]
    async fn distinct_symbols_evict_least_recently_used() {
        let mut config = AnalyzerConfig::default();
        config.cache_capacity = 2;
        let analyzer = MarketAnalyzer::new(
            config,
            SharedHistory::new(trending_bars(60)),
            Arc::new(NoNews),
            SentimentAnalyzer::new(SentimentBackend::Disabled),
        );

        analyzer.analyze("AAA").await.unwrap().unwrap();
        analyzer.analyze("BBB").await.unwrap().unwrap();
        analyzer.analyze("AAA").await.unwrap().unwrap();
        analyzer.analyze("CCC").await.unwrap().unwrap();

        assert!(analyzer.cached_state("AAA").is_some());
        assert!(analyzer.cached_state("BBB").is_none());
        assert!(analyzer.cached_state("CCC").is_some());
    }
}
