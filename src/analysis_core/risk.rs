//! Risk profile: stops, targets and position sizing
//!
//! Stops and targets prefer confirmed swing structure, fall back to classic
//! floor-trader pivot levels from the previous bar, and finally to flat ATR
//! multiples. Sizing is half-Kelly capped by the per-trade risk budget.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::bars::Bar;
use super::swings::{SwingKind, SwingPoint};
use crate::config::RiskConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Long,
    Short,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeDirection::Long => write!(f, "LONG"),
            TradeDirection::Short => write!(f, "SHORT"),
        }
    }
}

/// Stop, target and sizing for one trade idea. All-zero when no directional
/// read exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskProfile {
    pub stop_loss: f64,
    pub target: f64,
    /// Distance from entry to stop.
    pub risk_distance: f64,
    pub risk_reward: f64,
    pub suggested_shares: u64,
    pub position_size_pct: f64,
}

impl RiskProfile {
    pub fn zero() -> Self {
        Self {
            stop_loss: 0.0,
            target: 0.0,
            risk_distance: 0.0,
            risk_reward: 0.0,
            suggested_shares: 0,
            position_size_pct: 0.0,
        }
    }
}

/// Floor-trader pivot levels from the previous bar.
#[derive(Debug, Clone, Copy)]
struct PivotLevels {
    r1: f64,
    s1: f64,
}

impl PivotLevels {
    fn from_bar(bar: &Bar) -> Self {
        let pivot = (bar.high + bar.low + bar.close) / 3.0;
        Self {
            r1: 2.0 * pivot - bar.low,
            s1: 2.0 * pivot - bar.high,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Liquidity and volatility floor: skip names that are too thin to fill
    /// or too quiet to pay for the risk.
    pub fn check_tradeability(&self, price: f64, avg_volume: f64, atr: f64) -> bool {
        if price * avg_volume < self.config.min_dollar_volume {
            return false;
        }
        if atr <= 0.0 || atr / price < self.config.min_volatility_ratio {
            return false;
        }
        true
    }

    pub fn calculate_risk(
        &self,
        price: f64,
        atr: f64,
        direction: TradeDirection,
        confidence: f64,
        swings: &[SwingPoint],
        prev_bar: Option<&Bar>,
    ) -> RiskProfile {
        // A dead ATR would zero every distance downstream.
        let atr = if atr <= 0.0 { price * 0.02 } else { atr };

        let pivots = prev_bar.map(PivotLevels::from_bar);
        let buffer = atr * 0.5;

        let (stop, target) = match direction {
            TradeDirection::Long => {
                let support = swings
                    .iter()
                    .filter(|s| s.kind == SwingKind::Low && s.price < price)
                    .map(|s| s.price)
                    .fold(None::<f64>, |acc, p| Some(acc.map_or(p, |a| a.max(p))));

                let stop = match support {
                    Some(support) if price - support > buffer => support - buffer,
                    _ => match pivots {
                        Some(p) if p.s1 < price => {
                            let dist = price - p.s1;
                            if dist > atr * 3.0 || dist < atr * 0.5 {
                                price - atr * 2.0
                            } else {
                                p.s1
                            }
                        }
                        _ => price - atr * 2.0,
                    },
                };

                let resistance = swings
                    .iter()
                    .filter(|s| s.kind == SwingKind::High && s.price > price)
                    .map(|s| s.price)
                    .fold(None::<f64>, |acc, p| Some(acc.map_or(p, |a| a.min(p))));

                let target = match resistance {
                    Some(resistance) if resistance - price > atr => resistance,
                    _ => match pivots {
                        Some(p) if p.r1 > price => {
                            if p.r1 - price < atr {
                                price + atr * 3.0
                            } else {
                                p.r1
                            }
                        }
                        _ => price + atr * 3.0,
                    },
                };

                (stop, target)
            }
            TradeDirection::Short => {
                let resistance = swings
                    .iter()
                    .filter(|s| s.kind == SwingKind::High && s.price > price)
                    .map(|s| s.price)
                    .fold(None::<f64>, |acc, p| Some(acc.map_or(p, |a| a.min(p))));

                let stop = match resistance {
                    Some(resistance) if resistance - price > buffer => resistance + buffer,
                    _ => match pivots {
                        Some(p) if p.r1 > price => {
                            let dist = p.r1 - price;
                            if dist > atr * 3.0 || dist < atr * 0.5 {
                                price + atr * 2.0
                            } else {
                                p.r1
                            }
                        }
                        _ => price + atr * 2.0,
                    },
                };

                let support = swings
                    .iter()
                    .filter(|s| s.kind == SwingKind::Low && s.price < price)
                    .map(|s| s.price)
                    .fold(None::<f64>, |acc, p| Some(acc.map_or(p, |a| a.max(p))));

                let target = match support {
                    Some(support) if price - support > atr => support,
                    _ => match pivots {
                        Some(p) if p.s1 < price => {
                            if price - p.s1 < atr {
                                price - atr * 3.0
                            } else {
                                p.s1
                            }
                        }
                        _ => price - atr * 3.0,
                    },
                };

                (stop, target)
            }
        };

        let loss = (price - stop).abs();
        let profit = (target - price).abs();
        let risk_reward = if loss > 0.0 { profit / loss } else { 0.0 };

        let win_prob = confidence.clamp(0.1, 0.9);
        let loss_prob = 1.0 - win_prob;
        let kelly = if risk_reward > 0.0 {
            win_prob - loss_prob / risk_reward
        } else {
            0.0
        };

        // Half-Kelly, capped by the flat per-trade risk budget.
        let optimal_fraction = (kelly * 0.5).max(0.0);
        let risk_amount = (self.config.equity * optimal_fraction)
            .min(self.config.equity * self.config.risk_per_trade);

        let suggested_shares = if loss > 0.0 && risk_amount > 0.0 {
            (risk_amount / loss) as u64
        } else {
            0
        };

        let position_size_pct = if self.config.equity > 0.0 {
            suggested_shares as f64 * price / self.config.equity
        } else {
            0.0
        };

        RiskProfile {
            stop_loss: stop,
            target,
            risk_distance: loss,
            risk_reward,
            suggested_shares,
            position_size_pct,
        }
    }
}
