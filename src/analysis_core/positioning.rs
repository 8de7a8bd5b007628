//! Position recommendation
//!
//! Maps the composite score and current regime onto a concrete action, trade
//! type and entry-signal tag: continuation with the trend, mean reversion
//! inside a range, or counter-trend only when a reversal pattern backs it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::indicators::IndicatorSnapshot;
use super::regime::MarketRegime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    LongSwing,
    ShortSwing,
    LongMeanRevert,
    ShortMeanRevert,
    LongReversal,
    ShortReversal,
    Neutral,
}

impl TradeType {
    /// Whether this trade type takes long exposure.
    pub fn is_long(&self) -> bool {
        matches!(
            self,
            TradeType::LongSwing | TradeType::LongMeanRevert | TradeType::LongReversal
        )
    }

    /// Whether this trade type takes short exposure.
    pub fn is_short(&self) -> bool {
        matches!(
            self,
            TradeType::ShortSwing | TradeType::ShortMeanRevert | TradeType::ShortReversal
        )
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::LongSwing => write!(f, "LONG_SWING"),
            TradeType::ShortSwing => write!(f, "SHORT_SWING"),
            TradeType::LongMeanRevert => write!(f, "LONG_MEAN_REVERT"),
            TradeType::ShortMeanRevert => write!(f, "SHORT_MEAN_REVERT"),
            TradeType::LongReversal => write!(f, "LONG_REVERSAL"),
            TradeType::ShortReversal => write!(f, "SHORT_REVERSAL"),
            TradeType::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySignal {
    PullbackEma20,
    Breakout,
    Breakdown,
    Reversal,
    None,
}

impl fmt::Display for EntrySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySignal::PullbackEma20 => write!(f, "PULLBACK_EMA20"),
            EntrySignal::Breakout => write!(f, "BREAKOUT"),
            EntrySignal::Breakdown => write!(f, "BREAKDOWN"),
            EntrySignal::Reversal => write!(f, "REVERSAL"),
            EntrySignal::None => write!(f, "NONE"),
        }
    }
}

/// The position read handed to the risk manager and the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecommendation {
    pub action: Action,
    pub trade_type: TradeType,
    pub confidence: f64,
    pub rationale: String,
    pub entry_signal: EntrySignal,
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    bias_threshold: f64,
    /// EMA20 proximity band for tagging an entry as a pullback.
    pullback_band: f64,
}

impl PositionManager {
    pub fn new(bias_threshold: f64) -> Self {
        Self {
            bias_threshold,
            pullback_band: 0.02,
        }
    }

    pub fn recommend(
        &self,
        score: f64,
        regime: MarketRegime,
        snapshot: &IndicatorSnapshot,
        patterns: &[String],
        price: f64,
    ) -> PositionRecommendation {
        let bullish = score > self.bias_threshold;
        let bearish = score < -self.bias_threshold;

        if !bullish && !bearish {
            return PositionRecommendation {
                action: Action::Hold,
                trade_type: TradeType::Neutral,
                confidence: 0.0,
                rationale: "neutral score".to_string(),
                entry_signal: EntrySignal::None,
            };
        }

        let confidence = score.abs();
        let mut action = Action::Hold;
        let mut trade_type = TradeType::Neutral;
        let rationale;
        let mut entry_signal = EntrySignal::None;

        if bullish {
            match regime {
                MarketRegime::BullTrend | MarketRegime::Transition => {
                    action = Action::Buy;
                    trade_type = TradeType::LongSwing;
                    rationale = "trend continuation";
                    entry_signal = match snapshot.ema20 {
                        Some(ema20) if price < ema20 * (1.0 + self.pullback_band) => {
                            EntrySignal::PullbackEma20
                        }
                        _ => EntrySignal::Breakout,
                    };
                }
                MarketRegime::Range => {
                    if matches!(snapshot.rsi, Some(rsi) if rsi < 40.0) {
                        action = Action::Buy;
                        trade_type = TradeType::LongMeanRevert;
                        rationale = "range support buy";
                        entry_signal = EntrySignal::Reversal;
                    } else {
                        rationale = "bullish but ranging";
                    }
                }
                MarketRegime::BearTrend => {
                    if patterns
                        .iter()
                        .any(|p| p.contains("BOTTOM") || p.contains("INVERSE"))
                    {
                        action = Action::Buy;
                        trade_type = TradeType::LongReversal;
                        rationale = "counter-trend pattern";
                        entry_signal = EntrySignal::Breakout;
                    } else {
                        rationale = "bullish score vs bear trend";
                    }
                }
                _ => rationale = "bullish score, unclassified regime",
            }
        } else {
            match regime {
                MarketRegime::BearTrend | MarketRegime::Transition => {
                    action = Action::Sell;
                    trade_type = TradeType::ShortSwing;
                    rationale = "trend continuation down";
                    entry_signal = match snapshot.ema20 {
                        Some(ema20) if price > ema20 * (1.0 - self.pullback_band) => {
                            EntrySignal::PullbackEma20
                        }
                        _ => EntrySignal::Breakdown,
                    };
                }
                MarketRegime::Range => {
                    if matches!(snapshot.rsi, Some(rsi) if rsi > 60.0) {
                        action = Action::Sell;
                        trade_type = TradeType::ShortMeanRevert;
                        rationale = "range resistance sell";
                        entry_signal = EntrySignal::Reversal;
                    } else {
                        rationale = "bearish but ranging";
                    }
                }
                MarketRegime::BullTrend => {
                    if patterns
                        .iter()
                        .any(|p| p.contains("TOP") || p.contains("HEAD"))
                    {
                        action = Action::Sell;
                        trade_type = TradeType::ShortReversal;
                        rationale = "top pattern in trend";
                        entry_signal = EntrySignal::Breakdown;
                    } else {
                        rationale = "bearish score vs bull trend";
                    }
                }
                _ => rationale = "bearish score, unclassified regime",
            }
        }

        if action == Action::Hold {
            trade_type = TradeType::Neutral;
        }

        PositionRecommendation {
            action,
            trade_type,
            confidence,
            rationale: rationale.to_string(),
            entry_signal,
        }
    }
}
