//! Multi-factor scoring
//!
//! Blends trend, momentum, volume, pattern and sentiment sub-scores with a
//! fixed per-regime weight table into a single value in [-1, 1].

use super::indicators::IndicatorSnapshot;
use super::regime::MarketRegime;
use super::volume::{VolumeSignal, VolumeStatus, VolumeTrend};

/// Per-regime factor weights. Each row sums to 1.0.
#[derive(Debug, Clone, Copy)]
struct Weights {
    trend: f64,
    momentum: f64,
    volume: f64,
    pattern: f64,
    sentiment: f64,
}

fn weights_for(regime: MarketRegime) -> Weights {
    match regime {
        MarketRegime::BullTrend | MarketRegime::BearTrend => Weights {
            trend: 0.35,
            momentum: 0.20,
            volume: 0.20,
            pattern: 0.15,
            sentiment: 0.10,
        },
        MarketRegime::Range => Weights {
            trend: 0.10,
            momentum: 0.40,
            volume: 0.10,
            pattern: 0.30,
            sentiment: 0.10,
        },
        MarketRegime::Volatile => Weights {
            trend: 0.10,
            momentum: 0.10,
            volume: 0.40,
            pattern: 0.10,
            sentiment: 0.30,
        },
        MarketRegime::Transition | MarketRegime::Unknown => Weights {
            trend: 0.20,
            momentum: 0.20,
            volume: 0.20,
            pattern: 0.20,
            sentiment: 0.20,
        },
    }
}

const BULLISH_KEYWORDS: [&str; 4] = ["BOTTOM", "INVERSE", "BULL", "UPTREND"];
const BEARISH_KEYWORDS: [&str; 4] = ["TOP", "HEAD", "BEAR", "DOWNTREND"];

fn clamp(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_score(
        &self,
        regime: MarketRegime,
        patterns: &[String],
        volume: &VolumeSignal,
        sentiment_score: f64,
        snapshot: &IndicatorSnapshot,
    ) -> f64 {
        let w = weights_for(regime);

        let mut trend = 0.0;
        if let (Some(ema20), Some(ema50)) = (snapshot.ema20, snapshot.ema50) {
            if ema20 > ema50 {
                trend = 1.0;
                // Conflicting longer-term trend halves the read.
                if matches!(snapshot.ema200, Some(ema200) if ema50 <= ema200) {
                    trend = 0.5;
                }
            } else if ema20 < ema50 {
                trend = -1.0;
                if matches!(snapshot.ema200, Some(ema200) if ema50 >= ema200) {
                    trend = -0.5;
                }
            }
        }

        let mut momentum = 0.0;
        if let Some(rsi) = snapshot.rsi {
            momentum = clamp((rsi - 50.0) / 50.0);

            match regime {
                // Mean-reversion framing: strength is a fade, weakness a buy.
                MarketRegime::Range => momentum = -momentum,
                MarketRegime::BullTrend => {
                    if rsi > 75.0 {
                        momentum = 0.0;
                    } else if rsi < 40.0 {
                        momentum = 0.5;
                    }
                }
                MarketRegime::BearTrend => {
                    if rsi < 25.0 {
                        momentum = 0.0;
                    } else if rsi > 60.0 {
                        momentum = -0.5;
                    }
                }
                _ => {}
            }
        }

        let mut vol_score = match volume.trend {
            VolumeTrend::Accumulation => 1.0,
            VolumeTrend::Distribution => -1.0,
            VolumeTrend::Neutral => 0.0,
        };
        // Climax exhaustion: huge volume that moved price very little argues
        // the move is ending, so the volume read flips.
        if volume.evr < 0.5 && volume.status == VolumeStatus::Climax {
            vol_score = -vol_score;
        }

        let mut pat_score = 0.0;
        for pattern in patterns {
            if BULLISH_KEYWORDS.iter().any(|k| pattern.contains(k)) {
                pat_score += 1.0;
            }
            if BEARISH_KEYWORDS.iter().any(|k| pattern.contains(k)) {
                pat_score -= 1.0;
            }
        }
        let pat_score = clamp(pat_score);

        let sent_score = clamp(sentiment_score);

        clamp(
            w.trend * trend
                + w.momentum * momentum
                + w.volume * vol_score
                + w.pattern * pat_score
                + w.sentiment * sent_score,
        )
    }
}
