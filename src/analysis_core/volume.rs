//! Volume behavior analysis
//!
//! Classifies the latest bar's volume against its recent average and pairs
//! that with the direction of the price move, producing the volume sub-signal
//! consumed by the scoring engine and the report.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::bars::Bar;
use crate::config::VolumeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeStatus {
    Normal,
    Low,
    Spike,
    Climax,
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeStatus::Normal => write!(f, "NORMAL"),
            VolumeStatus::Low => write!(f, "LOW"),
            VolumeStatus::Spike => write!(f, "SPIKE"),
            VolumeStatus::Climax => write!(f, "CLIMAX"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeTrend {
    Neutral,
    Accumulation,
    Distribution,
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeTrend::Neutral => write!(f, "NEUTRAL"),
            VolumeTrend::Accumulation => write!(f, "ACCUMULATION"),
            VolumeTrend::Distribution => write!(f, "DISTRIBUTION"),
        }
    }
}

/// Volume read for one bar.
///
/// `evr` is the excess-volume ratio: ATR-normalized price move divided by the
/// volume ratio. A climax with `evr` under 0.5 reads as exhaustion (lots of
/// volume, little movement).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolumeSignal {
    pub status: VolumeStatus,
    pub trend: VolumeTrend,
    pub evr: f64,
    pub climax: bool,
}

impl VolumeSignal {
    pub fn neutral() -> Self {
        Self {
            status: VolumeStatus::Normal,
            trend: VolumeTrend::Neutral,
            evr: 0.0,
            climax: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VolumeAnalyzer {
    config: VolumeConfig,
}

impl VolumeAnalyzer {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }

    /// Classify the bar's volume. Degenerate inputs (non-positive average
    /// volume or ATR) yield the neutral signal rather than an error.
    pub fn analyze(&self, bar: &Bar, avg_volume: f64, reference_close: f64, atr: f64) -> VolumeSignal {
        if avg_volume <= 0.0 || atr <= 0.0 {
            return VolumeSignal::neutral();
        }

        let price_change = bar.close - reference_close;
        let vol_ratio = bar.volume / avg_volume;

        let (status, climax) = if vol_ratio > self.config.climax_ratio {
            (VolumeStatus::Climax, true)
        } else if vol_ratio > self.config.spike_ratio {
            (VolumeStatus::Spike, false)
        } else if vol_ratio < self.config.low_ratio {
            (VolumeStatus::Low, false)
        } else {
            (VolumeStatus::Normal, false)
        };

        let trend = if vol_ratio > 1.0 {
            if price_change > 0.0 {
                VolumeTrend::Accumulation
            } else if price_change < 0.0 {
                VolumeTrend::Distribution
            } else {
                VolumeTrend::Neutral
            }
        } else {
            VolumeTrend::Neutral
        };

        let price_norm = price_change.abs() / atr;
        let evr = if vol_ratio > 0.0 {
            price_norm / vol_ratio
        } else {
            0.0
        };

        VolumeSignal {
            status,
            trend,
            evr,
            climax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    fn analyzer() -> VolumeAnalyzer {
        VolumeAnalyzer::new(VolumeConfig::default())
    }

    #[test]
    fn degenerate_inputs_read_neutral() {
        let a = analyzer();
        let sig = a.analyze(&bar(100.0, 1000.0), 0.0, 99.0, 2.0);
        assert_eq!(sig.status, VolumeStatus::Normal);
        assert_eq!(sig.trend, VolumeTrend::Neutral);

        let sig = a.analyze(&bar(100.0, 1000.0), 1000.0, 99.0, 0.0);
        assert_eq!(sig.trend, VolumeTrend::Neutral);
    }

    #[test]
    fn ratio_thresholds() {
        let a = analyzer();
        assert_eq!(a.analyze(&bar(100.0, 4000.0), 1000.0, 99.0, 2.0).status, VolumeStatus::Climax);
        assert_eq!(a.analyze(&bar(100.0, 2000.0), 1000.0, 99.0, 2.0).status, VolumeStatus::Spike);
        assert_eq!(a.analyze(&bar(100.0, 400.0), 1000.0, 99.0, 2.0).status, VolumeStatus::Low);
        assert_eq!(a.analyze(&bar(100.0, 1000.0), 1000.0, 99.0, 2.0).status, VolumeStatus::Normal);
    }

    #[test]
    fn accumulation_needs_above_average_volume_and_rising_price() {
        let a = analyzer();
        let sig = a.analyze(&bar(100.0, 2000.0), 1000.0, 98.0, 2.0);
        assert_eq!(sig.trend, VolumeTrend::Accumulation);

        let sig = a.analyze(&bar(100.0, 2000.0), 1000.0, 102.0, 2.0);
        assert_eq!(sig.trend, VolumeTrend::Distribution);

        // Heavy move on thin volume is not accumulation.
        let sig = a.analyze(&bar(100.0, 500.0), 1000.0, 98.0, 2.0);
        assert_eq!(sig.trend, VolumeTrend::Neutral);
    }

    #[test]
    fn evr_normalizes_move_by_volume() {
        let a = analyzer();
        // |change|/atr = 2/2 = 1, ratio = 2 -> evr 0.5
        let sig = a.analyze(&bar(100.0, 2000.0), 1000.0, 98.0, 2.0);
        assert!((sig.evr - 0.5).abs() < 1e-9);
    }
}
