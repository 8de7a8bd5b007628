//! Historical pattern statistics
//!
//! A static lookup of how each pattern family has resolved historically,
//! shaded by the current regime. Feeds the optional win-rate/average-move
//! fields of the report; no simulation happens here.

use serde::{Deserialize, Serialize};

use super::regime::MarketRegime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BacktestStats {
    pub win_rate: f64,
    pub avg_move: f64,
    pub max_drawdown: f64,
    pub expectancy: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BacktestEngine;

impl BacktestEngine {
    pub fn new() -> Self {
        Self
    }

    /// Stats for the first recognized pattern family, or `None` when no
    /// pattern has table coverage.
    pub fn get_stats(&self, patterns: &[String], regime: MarketRegime) -> Option<BacktestStats> {
        let drawdown = 0.02;

        let modifier = match regime {
            MarketRegime::BullTrend => 1.2,
            MarketRegime::Range => 0.8,
            _ => 1.0,
        };

        let mut matched = None;
        for pattern in patterns {
            if pattern.contains("DOUBLE_BOTTOM") {
                matched = Some((0.62 * modifier, 0.05));
                break;
            } else if pattern.contains("DOUBLE_TOP") {
                matched = Some((0.65 * modifier, 0.04));
                break;
            } else if pattern.contains("HEAD_AND_SHOULDERS") {
                matched = Some((0.68 * modifier, 0.06));
                break;
            } else if pattern.contains("BREAKOUT") {
                matched = Some(if regime == MarketRegime::BullTrend {
                    (0.70, 0.08)
                } else {
                    (0.40, 0.02)
                });
                break;
            }
        }

        let (win_rate, avg_move) = matched?;
        let expectancy = win_rate * avg_move - (1.0 - win_rate) * drawdown;

        Some(BacktestStats {
            win_rate,
            avg_move,
            max_drawdown: drawdown,
            expectancy,
        })
    }
}
