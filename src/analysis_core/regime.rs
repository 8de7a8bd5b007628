//! Market regime classification
//!
//! Pure function of the latest indicator snapshot. The decision tree as
//! implemented only ever reaches the trend, range and unknown variants;
//! `Volatile` and `Transition` stay in the enumeration because the scoring
//! weight table and the position recommendation table consume them. Known
//! gap, kept rather than papered over with invented branches.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::indicators::IndicatorSnapshot;
use crate::config::RegimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    BullTrend,
    BearTrend,
    Range,
    Volatile,
    Transition,
    Unknown,
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketRegime::BullTrend => write!(f, "BULL_TREND"),
            MarketRegime::BearTrend => write!(f, "BEAR_TREND"),
            MarketRegime::Range => write!(f, "RANGE"),
            MarketRegime::Volatile => write!(f, "VOLATILE"),
            MarketRegime::Transition => write!(f, "TRANSITION"),
            MarketRegime::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    config: RegimeConfig,
}

impl RegimeClassifier {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    /// Classify from the latest snapshot.
    ///
    /// Only a missing (`None`) ema20/ema50/adx yields `Unknown`; a reading of
    /// exactly 0.0 is a valid value and classifies normally.
    pub fn classify(&self, snapshot: &IndicatorSnapshot) -> MarketRegime {
        let (Some(ema20), Some(ema50), Some(adx)) =
            (snapshot.ema20, snapshot.ema50, snapshot.adx)
        else {
            return MarketRegime::Unknown;
        };

        if adx > self.config.adx_trend_threshold {
            if ema20 > ema50 {
                return MarketRegime::BullTrend;
            } else if ema20 < ema50 {
                return MarketRegime::BearTrend;
            }
        }

        // Weaker trend reading still counts when the EMAs agree.
        if adx > self.config.adx_weak_trend_threshold {
            if ema20 > ema50 {
                return MarketRegime::BullTrend;
            } else if ema20 < ema50 {
                return MarketRegime::BearTrend;
            }
        }

        MarketRegime::Range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ema20: Option<f64>, ema50: Option<f64>, rsi: Option<f64>, adx: Option<f64>) -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema20,
            ema50,
            rsi,
            adx,
            ..Default::default()
        }
    }

    fn classifier() -> RegimeClassifier {
        RegimeClassifier::new(RegimeConfig::default())
    }

    #[test]
    fn strong_adx_with_ema_ordering_is_a_trend() {
        let c = classifier();
        let snap = snapshot(Some(110.0), Some(105.0), Some(55.0), Some(30.0));
        assert_eq!(c.classify(&snap), MarketRegime::BullTrend);

        let snap = snapshot(Some(100.0), Some(105.0), Some(45.0), Some(30.0));
        assert_eq!(c.classify(&snap), MarketRegime::BearTrend);
    }

    #[test]
    fn zero_is_a_valid_reading_not_missing() {
        let c = classifier();
        let snap = snapshot(Some(0.0), Some(1.0), Some(0.0), Some(30.0));
        assert_eq!(c.classify(&snap), MarketRegime::BearTrend);
    }

    #[test]
    fn missing_inputs_are_unknown() {
        let c = classifier();
        assert_eq!(
            c.classify(&snapshot(None, Some(105.0), Some(50.0), Some(30.0))),
            MarketRegime::Unknown
        );
        assert_eq!(
            c.classify(&snapshot(Some(100.0), Some(105.0), Some(50.0), None)),
            MarketRegime::Unknown
        );
    }

    #[test]
    fn weak_adx_falls_through_to_range() {
        let c = classifier();
        let snap = snapshot(Some(100.0), Some(100.0), Some(50.0), Some(20.0));
        assert_eq!(c.classify(&snap), MarketRegime::Range);

        let snap = snapshot(Some(110.0), Some(105.0), Some(50.0), Some(8.0));
        assert_eq!(c.classify(&snap), MarketRegime::Range);
    }

    #[test]
    fn weak_trend_band_still_classifies_direction() {
        let c = classifier();
        let snap = snapshot(Some(110.0), Some(105.0), Some(50.0), Some(12.0));
        assert_eq!(c.classify(&snap), MarketRegime::BullTrend);
    }

    #[test]
    fn display_is_total() {
        for regime in [
            MarketRegime::BullTrend,
            MarketRegime::BearTrend,
            MarketRegime::Range,
            MarketRegime::Volatile,
            MarketRegime::Transition,
            MarketRegime::Unknown,
        ] {
            assert!(!regime.to_string().is_empty());
        }
    }
}
