//! Tunable configuration for the analysis pipeline
//!
//! Every constant a deployment might reasonably tune lives here, grouped per
//! component with defaults matching the shipped behavior.

/// Indicator periods.
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    /// Short EMA period (default: 20)
    pub ema_short: usize,
    /// Medium EMA period (default: 50)
    pub ema_medium: usize,
    /// Long EMA period (default: 200)
    pub ema_long: usize,
    /// RSI period (default: 14)
    pub rsi_period: usize,
    /// ATR period (default: 14)
    pub atr_period: usize,
    /// ADX period (default: 14)
    pub adx_period: usize,
    /// Bollinger window (default: 20)
    pub bollinger_period: usize,
    /// Bollinger standard-deviation multiplier (default: 2.0)
    pub bollinger_std_dev: f64,
    /// MACD fast EMA period (default: 12)
    pub macd_fast: usize,
    /// MACD slow EMA period (default: 26)
    pub macd_slow: usize,
    /// MACD signal EMA period (default: 9)
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_short: 20,
            ema_medium: 50,
            ema_long: 200,
            rsi_period: 14,
            atr_period: 14,
            adx_period: 14,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

/// Pattern recognition tolerances.
#[derive(Debug, Clone)]
pub struct PatternConfig {
    /// Two prices count as one level within this fraction of their average
    /// (default: 0.03)
    pub level_tolerance: f64,
    /// Looser alignment band for head-and-shoulders shoulders (default: 0.05)
    pub shoulder_tolerance: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            level_tolerance: 0.03,
            shoulder_tolerance: 0.05,
        }
    }
}

/// Regime classification thresholds.
#[derive(Debug, Clone)]
pub struct RegimeConfig {
    /// ADX above this reads as a confirmed trend (default: 15.0)
    pub adx_trend_threshold: f64,
    /// ADX above this still trends when the EMAs agree (default: 10.0)
    pub adx_weak_trend_threshold: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            adx_trend_threshold: 15.0,
            adx_weak_trend_threshold: 10.0,
        }
    }
}

/// Volume ratio thresholds against the rolling average.
#[derive(Debug, Clone)]
pub struct VolumeConfig {
    /// Below this ratio volume is LOW (default: 0.5)
    pub low_ratio: f64,
    /// Above this ratio volume is a SPIKE (default: 1.5)
    pub spike_ratio: f64,
    /// Above this ratio volume is a CLIMAX (default: 3.0)
    pub climax_ratio: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            low_ratio: 0.5,
            spike_ratio: 1.5,
            climax_ratio: 3.0,
        }
    }
}

/// Account and sizing parameters.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Account equity in dollars (default: 100_000)
    pub equity: f64,
    /// Fraction of equity risked per trade (default: 0.01)
    pub risk_per_trade: f64,
    /// Minimum average daily dollar volume (default: $2M)
    pub min_dollar_volume: f64,
    /// Minimum ATR as a fraction of price (default: 0.005)
    pub min_volatility_ratio: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            equity: 100_000.0,
            risk_per_trade: 0.01,
            min_dollar_volume: 2_000_000.0,
            min_volatility_ratio: 0.005,
        }
    }
}

/// Top-level analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Daily bars of history requested per analysis (default: 300)
    pub lookback_days: usize,
    /// Symbols kept in the LRU cache (default: 50)
    pub cache_capacity: usize,
    /// Swing reversal threshold as a fraction of the extreme (default: 0.03)
    pub swing_threshold: f64,
    /// Composite score beyond which a directional bias forms (default: 0.4)
    pub bias_threshold: f64,
    /// Bars averaged for the volume baseline (default: 20)
    pub volume_average_window: usize,
    pub indicators: IndicatorConfig,
    pub patterns: PatternConfig,
    pub regime: RegimeConfig,
    pub volume: VolumeConfig,
    pub risk: RiskConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            lookback_days: 300,
            cache_capacity: 50,
            swing_threshold: 0.03,
            bias_threshold: 0.4,
            volume_average_window: 20,
            indicators: IndicatorConfig::default(),
            patterns: PatternConfig::default(),
            regime: RegimeConfig::default(),
            volume: VolumeConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_constants() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.lookback_days, 300);
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.indicators.ema_short, 20);
        assert_eq!(config.indicators.ema_medium, 50);
        assert_eq!(config.indicators.ema_long, 200);
        assert_eq!(config.indicators.macd_slow, 26);
        assert!((config.swing_threshold - 0.03).abs() < 1e-12);
        assert!((config.risk.equity - 100_000.0).abs() < 1e-12);
        assert!((config.regime.adx_trend_threshold - 15.0).abs() < 1e-12);
        assert!((config.volume.climax_ratio - 3.0).abs() < 1e-12);
    }
}
