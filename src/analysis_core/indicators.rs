//! Streaming technical indicators
//!
//! Every indicator is an owned-state struct consuming one bar (or one price)
//! per update and returning its current value, or `None` until its warm-up
//! period has elapsed. Nothing here ever recomputes from raw history; that is
//! what lets a cached engine resume from exactly where it stopped when new
//! bars arrive.

use serde::{Deserialize, Serialize};

use super::bars::Bar;
use crate::config::IndicatorConfig;

/// Exponential moving average. Seeds on the first input, then
/// `value += (input - value) * 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    multiplier: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            multiplier: 2.0 / (period as f64 + 1.0),
            value: None,
        }
    }

    pub fn update(&mut self, price: f64) -> f64 {
        let next = match self.value {
            None => price,
            Some(v) => v + (price - v) * self.multiplier,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Relative strength index with Wilder smoothing.
///
/// Accumulates raw gain/loss sums for the first `period` price changes, then
/// switches to the smoothed recurrence.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
    last_price: Option<f64>,
    count: usize,
    accum_gain: f64,
    accum_loss: f64,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            avg_gain: None,
            avg_loss: None,
            last_price: None,
            count: 0,
            accum_gain: 0.0,
            accum_loss: 0.0,
        }
    }

    pub fn update(&mut self, price: f64) -> Option<f64> {
        let last = match self.last_price.replace(price) {
            // Needs one prior price before any change exists.
            None => return None,
            Some(p) => p,
        };

        let change = price - last;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        let (avg_gain, avg_loss) = match (self.avg_gain, self.avg_loss) {
            (Some(ag), Some(al)) => {
                let p = self.period as f64;
                ((ag * (p - 1.0) + gain) / p, (al * (p - 1.0) + loss) / p)
            }
            _ => {
                self.accum_gain += gain;
                self.accum_loss += loss;
                self.count += 1;
                if self.count < self.period {
                    return None;
                }
                let p = self.period as f64;
                (self.accum_gain / p, self.accum_loss / p)
            }
        };
        self.avg_gain = Some(avg_gain);
        self.avg_loss = Some(avg_loss);

        if avg_loss == 0.0 {
            Some(if avg_gain > 0.0 { 100.0 } else { 50.0 })
        } else {
            let rs = avg_gain / avg_loss;
            Some(100.0 - 100.0 / (1.0 + rs))
        }
    }
}

/// Average true range, Wilder-smoothed after a `period`-bar accumulation.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    value: Option<f64>,
    last_close: Option<f64>,
    count: usize,
    accum_tr: f64,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            value: None,
            last_close: None,
            count: 0,
            accum_tr: 0.0,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let tr = match self.last_close {
            // First bar has no prior close: true range is just the bar range.
            None => high - low,
            Some(prev) => (high - low)
                .max((high - prev).abs())
                .max((low - prev).abs()),
        };
        self.last_close = Some(close);

        match self.value {
            None => {
                self.accum_tr += tr;
                self.count += 1;
                if self.count == self.period {
                    self.value = Some(self.accum_tr / self.period as f64);
                }
            }
            Some(v) => {
                let p = self.period as f64;
                self.value = Some((v * (p - 1.0) + tr) / p);
            }
        }

        self.value
    }
}

/// MACD line, signal line and histogram from three EMAs.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

/// One MACD reading. The histogram stays `None` until the signal EMA has
/// produced a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacdOutput {
    pub line: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
        }
    }

    pub fn update(&mut self, price: f64) -> MacdOutput {
        let line = self.fast.update(price) - self.slow.update(price);
        let signal = self.signal.update(line);
        MacdOutput {
            line: Some(line),
            signal: Some(signal),
            histogram: Some(line - signal),
        }
    }
}

/// Cumulative volume-weighted average price. Never resets on its own; the
/// caller decides the accumulation window by constructing a fresh instance.
#[derive(Debug, Clone, Default)]
pub struct Vwap {
    cum_volume: f64,
    cum_vol_price: f64,
}

impl Vwap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64, volume: f64) -> f64 {
        let typical = (high + low + close) / 3.0;
        self.cum_volume += volume;
        self.cum_vol_price += typical * volume;

        if self.cum_volume > 0.0 {
            self.cum_vol_price / self.cum_volume
        } else {
            typical
        }
    }
}

/// On-balance volume running sum.
#[derive(Debug, Clone, Default)]
pub struct Obv {
    value: f64,
    last_close: Option<f64>,
}

impl Obv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, close: f64, volume: f64) -> f64 {
        if let Some(prev) = self.last_close {
            if close > prev {
                self.value += volume;
            } else if close < prev {
                self.value -= volume;
            }
        }
        self.last_close = Some(close);
        self.value
    }
}

/// Bollinger bands over a fixed trailing window, maintained with a running
/// sum and sum of squares so each update is O(1).
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev: f64,
    prices: std::collections::VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

/// Band values for one update.
#[derive(Debug, Clone, Copy, Default)]
pub struct BollingerOutput {
    pub upper: Option<f64>,
    pub lower: Option<f64>,
    pub basis: Option<f64>,
    pub width: Option<f64>,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev: f64) -> Self {
        Self {
            period,
            std_dev,
            prices: std::collections::VecDeque::with_capacity(period),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn update(&mut self, price: f64) -> BollingerOutput {
        if self.prices.len() == self.period {
            if let Some(old) = self.prices.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
        self.prices.push_back(price);
        self.sum += price;
        self.sum_sq += price * price;

        if self.prices.len() < self.period {
            return BollingerOutput::default();
        }

        let n = self.period as f64;
        let mean = self.sum / n;
        // Clamp: floating error can push the variance a hair below zero.
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        let std = variance.sqrt();

        let upper = mean + self.std_dev * std;
        let lower = mean - self.std_dev * std;
        let width = if mean != 0.0 {
            (upper - lower) / mean
        } else {
            0.0
        };

        BollingerOutput {
            upper: Some(upper),
            lower: Some(lower),
            basis: Some(mean),
            width: Some(width),
        }
    }
}

/// Average directional index. +DM/-DM and true range are Wilder-smoothed the
/// same way as ATR; ADX itself is a Wilder-smoothed series of DX.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    last_high: Option<f64>,
    last_low: Option<f64>,
    last_close: Option<f64>,
    smooth_tr: Option<f64>,
    smooth_plus: Option<f64>,
    smooth_minus: Option<f64>,
    adx_smooth: Option<f64>,
    count: usize,
    accum_tr: f64,
    accum_plus: f64,
    accum_minus: f64,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            last_high: None,
            last_low: None,
            last_close: None,
            smooth_tr: None,
            smooth_plus: None,
            smooth_minus: None,
            adx_smooth: None,
            count: 0,
            accum_tr: 0.0,
            accum_plus: 0.0,
            accum_minus: 0.0,
        }
    }

    fn wilder(&self, prev: f64, curr: f64) -> f64 {
        let p = self.period as f64;
        (prev * (p - 1.0) + curr) / p
    }

    fn dx(plus: f64, minus: f64) -> f64 {
        let total = plus + minus;
        if total != 0.0 {
            (plus - minus).abs() / total * 100.0
        } else {
            0.0
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let (Some(prev_high), Some(prev_low), Some(prev_close)) =
            (self.last_high, self.last_low, self.last_close)
        else {
            self.last_high = Some(high);
            self.last_low = Some(low);
            self.last_close = Some(close);
            return None;
        };

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());

        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        self.last_high = Some(high);
        self.last_low = Some(low);
        self.last_close = Some(close);

        match (self.smooth_tr, self.smooth_plus, self.smooth_minus) {
            (Some(st), Some(sp), Some(sm)) => {
                self.smooth_tr = Some(self.wilder(st, tr));
                let sp = self.wilder(sp, plus_dm);
                let sm = self.wilder(sm, minus_dm);
                self.smooth_plus = Some(sp);
                self.smooth_minus = Some(sm);

                let dx = Self::dx(sp, sm);
                self.adx_smooth = Some(match self.adx_smooth {
                    None => dx,
                    Some(prev) => self.wilder(prev, dx),
                });
            }
            _ => {
                self.accum_tr += tr;
                self.accum_plus += plus_dm;
                self.accum_minus += minus_dm;
                self.count += 1;

                if self.count == self.period {
                    let p = self.period as f64;
                    let sp = self.accum_plus / p;
                    let sm = self.accum_minus / p;
                    self.smooth_tr = Some(self.accum_tr / p);
                    self.smooth_plus = Some(sp);
                    self.smooth_minus = Some(sm);
                    self.adx_smooth = Some(Self::dx(sp, sm));
                }
            }
        }

        self.adx_smooth
    }
}

/// Indicator values captured immediately after one bar was processed.
///
/// Each field is independently `None` until its indicator's warm-up period
/// has elapsed. A `Some(0.0)` is a real reading, never a stand-in for
/// missing data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub vwap: Option<f64>,
    pub upper_bollinger: Option<f64>,
    pub lower_bollinger: Option<f64>,
    pub bollinger_width: Option<f64>,
    pub adx: Option<f64>,
    pub obv: Option<f64>,
}

/// One live updater per indicator, fed bar by bar. One instance exists per
/// cached symbol and is owned by that symbol's cache entry.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    ema20: Ema,
    ema50: Ema,
    ema200: Ema,
    rsi: Rsi,
    atr: Atr,
    macd: Macd,
    vwap: Vwap,
    obv: Obv,
    bollinger: BollingerBands,
    adx: Adx,
}

impl IndicatorEngine {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            ema20: Ema::new(config.ema_short),
            ema50: Ema::new(config.ema_medium),
            ema200: Ema::new(config.ema_long),
            rsi: Rsi::new(config.rsi_period),
            atr: Atr::new(config.atr_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            vwap: Vwap::new(),
            obv: Obv::new(),
            bollinger: BollingerBands::new(config.bollinger_period, config.bollinger_std_dev),
            adx: Adx::new(config.adx_period),
        }
    }

    /// Feed one bar through every updater and capture the snapshot.
    pub fn update(&mut self, bar: &Bar) -> IndicatorSnapshot {
        let close = bar.close;

        let ema20 = self.ema20.update(close);
        let ema50 = self.ema50.update(close);
        let ema200 = self.ema200.update(close);
        let rsi = self.rsi.update(close);
        let atr = self.atr.update(bar.high, bar.low, close);
        let macd = self.macd.update(close);
        let vwap = self.vwap.update(bar.high, bar.low, close, bar.volume);
        let obv = self.obv.update(close, bar.volume);
        let bands = self.bollinger.update(close);
        let adx = self.adx.update(bar.high, bar.low, close);

        IndicatorSnapshot {
            ema20: Some(ema20),
            ema50: Some(ema50),
            ema200: Some(ema200),
            rsi,
            atr,
            macd_line: macd.line,
            macd_signal: macd.signal,
            macd_hist: macd.histogram,
            vwap: Some(vwap),
            upper_bollinger: bands.upper,
            lower_bollinger: bands.lower,
            bollinger_width: bands.width,
            adx,
            obv: Some(obv),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    fn bar(i: i64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn ema_seed_and_recurrence() {
        let mut ema = Ema::new(2);
        let values: Vec<f64> = [10.0, 20.0, 30.0].iter().map(|p| ema.update(*p)).collect();
        assert_close(values[0], 10.0);
        assert_close(values[1], 16.66667);
        assert_close(values[2], 25.55556);
    }

    #[test]
    fn rsi_warmup_then_wilder() {
        let mut rsi = Rsi::new(2);
        assert_eq!(rsi.update(10.0), None);
        assert_eq!(rsi.update(11.0), None);
        assert_close(rsi.update(12.0).unwrap(), 100.0);
        assert_close(rsi.update(11.0).unwrap(), 50.0);
    }

    #[test]
    fn rsi_flat_prices_read_neutral() {
        let mut rsi = Rsi::new(2);
        rsi.update(10.0);
        rsi.update(10.0);
        assert_close(rsi.update(10.0).unwrap(), 50.0);
    }

    #[test]
    fn atr_first_bar_has_no_prev_close() {
        let mut atr = Atr::new(2);
        assert_eq!(atr.update(10.0, 8.0, 9.0), None);
        assert_close(atr.update(11.0, 9.0, 10.0).unwrap(), 2.0);
        assert_close(atr.update(12.0, 10.0, 11.0).unwrap(), 2.0);
    }

    #[test]
    fn macd_histogram_from_first_bar() {
        let mut macd = Macd::new(12, 26, 9);
        let out = macd.update(100.0);
        // All three EMAs seed on the first input, so the histogram exists
        // immediately and reads zero.
        assert_close(out.line.unwrap(), 0.0);
        assert_close(out.histogram.unwrap(), 0.0);

        let out = macd.update(110.0);
        assert!(out.line.unwrap() > 0.0);
    }

    #[test]
    fn vwap_accumulates() {
        let mut vwap = Vwap::new();
        let v1 = vwap.update(12.0, 8.0, 10.0, 100.0);
        assert_close(v1, 10.0);
        let v2 = vwap.update(22.0, 18.0, 20.0, 100.0);
        assert_close(v2, 15.0);
    }

    #[test]
    fn obv_tracks_close_direction() {
        let mut obv = Obv::new();
        assert_close(obv.update(10.0, 500.0), 0.0);
        assert_close(obv.update(11.0, 300.0), 300.0);
        assert_close(obv.update(10.5, 200.0), 100.0);
        assert_close(obv.update(10.5, 400.0), 100.0);
    }

    #[test]
    fn bollinger_warmup_and_bands() {
        let mut bb = BollingerBands::new(3, 2.0);
        assert!(bb.update(10.0).basis.is_none());
        assert!(bb.update(20.0).basis.is_none());
        let out = bb.update(30.0);
        assert_close(out.basis.unwrap(), 20.0);
        // std of [10,20,30] (population) = sqrt(200/3)
        let std = (200.0f64 / 3.0).sqrt();
        assert_close(out.upper.unwrap(), 20.0 + 2.0 * std);
        assert_close(out.lower.unwrap(), 20.0 - 2.0 * std);
        assert_close(out.width.unwrap(), (4.0 * std) / 20.0);
    }

    #[test]
    fn bollinger_window_slides() {
        let mut bb = BollingerBands::new(2, 2.0);
        bb.update(10.0);
        bb.update(10.0);
        let out = bb.update(10.0);
        // Constant prices: zero-width bands, no negative-variance sqrt.
        assert_close(out.width.unwrap(), 0.0);
        assert_close(out.upper.unwrap(), 10.0);
    }

    #[test]
    fn adx_warms_up_after_period_changes() {
        let mut adx = Adx::new(2);
        assert_eq!(adx.update(10.0, 8.0, 9.0), None);
        assert_eq!(adx.update(11.0, 9.0, 10.0), None);
        // Two directional moves accumulated: first reading appears.
        let first = adx.update(12.0, 10.0, 11.0);
        assert!(first.is_some());
        // Straight up-moves only: DX pegs at 100.
        assert_close(first.unwrap(), 100.0);
    }

    #[test]
    fn engine_snapshot_fields_warm_independently() {
        let config = IndicatorConfig::default();
        let mut engine = IndicatorEngine::new(&config);

        let snap = engine.update(&bar(0, 102.0, 98.0, 100.0));
        assert!(snap.ema20.is_some());
        assert!(snap.vwap.is_some());
        assert!(snap.rsi.is_none());
        assert!(snap.atr.is_none());
        assert!(snap.upper_bollinger.is_none());
        assert!(snap.adx.is_none());

        let mut snap = IndicatorSnapshot::default();
        for i in 1..25 {
            snap = engine.update(&bar(i, 102.0 + i as f64, 98.0 + i as f64, 100.0 + i as f64));
        }
        assert!(snap.rsi.is_some());
        assert!(snap.atr.is_some());
        assert!(snap.upper_bollinger.is_some());
        assert!(snap.adx.is_some());
        assert!(snap.macd_hist.is_some());
    }
}
