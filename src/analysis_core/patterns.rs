//! Chart pattern recognition over recent swing points
//!
//! Stateless: labels are recomputed on every call from the current swing
//! history, so there is no cross-call identity or deduplication.

use super::swings::{SwingKind, SwingPoint};
use crate::config::PatternConfig;

/// Pattern labels detected from the most recent 3-5 swing points.
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    config: PatternConfig,
}

impl PatternRecognizer {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    /// Two prices sit on the same level if their difference is under
    /// `tolerance` of their average.
    fn check_level(price1: f64, price2: f64, tolerance: f64) -> bool {
        let diff = (price1 - price2).abs();
        let avg = (price1 + price2) / 2.0;
        diff / avg < tolerance
    }

    pub fn detect_patterns(&self, swings: &[SwingPoint]) -> Vec<String> {
        let mut patterns = Vec::new();
        let n = swings.len();
        if n < 3 {
            return patterns;
        }

        let tol = self.config.level_tolerance;
        let s1 = &swings[n - 3];
        let s2 = &swings[n - 2];
        let s3 = &swings[n - 1];

        if s1.kind == SwingKind::High && s2.kind == SwingKind::Low && s3.kind == SwingKind::High {
            if Self::check_level(s1.price, s3.price, tol) {
                patterns.push("POTENTIAL_DOUBLE_TOP".to_string());
            }
        }

        if s1.kind == SwingKind::Low && s2.kind == SwingKind::High && s3.kind == SwingKind::Low {
            if Self::check_level(s1.price, s3.price, tol) {
                patterns.push("POTENTIAL_DOUBLE_BOTTOM".to_string());
            }
        }

        if n >= 4 {
            let s0 = &swings[n - 4];

            // Four points: the double top/bottom resolved by the newest point
            // breaking past the middle pivot in the continuation direction.
            if s0.kind == SwingKind::High
                && s1.kind == SwingKind::Low
                && s2.kind == SwingKind::High
                && s3.kind == SwingKind::Low
                && Self::check_level(s0.price, s2.price, tol)
                && s3.price < s1.price
            {
                patterns.push("DOUBLE_TOP_BREAKOUT".to_string());
            }

            if s0.kind == SwingKind::Low
                && s1.kind == SwingKind::High
                && s2.kind == SwingKind::Low
                && s3.kind == SwingKind::High
                && Self::check_level(s0.price, s2.price, tol)
                && s3.price > s1.price
            {
                patterns.push("DOUBLE_BOTTOM_BREAKOUT".to_string());
            }
        }

        if n >= 5 {
            let s_a = &swings[n - 5];
            let s_c = &swings[n - 3];
            let s_e = &swings[n - 1];
            let shoulder_tol = self.config.shoulder_tolerance;

            if s_a.kind == SwingKind::High
                && s_c.kind == SwingKind::High
                && s_e.kind == SwingKind::High
            {
                let is_head = s_c.price > s_a.price && s_c.price > s_e.price;
                if is_head && Self::check_level(s_a.price, s_e.price, shoulder_tol) {
                    patterns.push("POTENTIAL_HEAD_AND_SHOULDERS".to_string());
                }
            }

            if s_a.kind == SwingKind::Low
                && s_c.kind == SwingKind::Low
                && s_e.kind == SwingKind::Low
            {
                let is_head = s_c.price < s_a.price && s_c.price < s_e.price;
                if is_head && Self::check_level(s_a.price, s_e.price, shoulder_tol) {
                    patterns.push("POTENTIAL_INVERSE_HEAD_AND_SHOULDERS".to_string());
                }
            }
        }

        patterns
    }

    /// Structural trend read from the last two highs and two lows.
    pub fn detect_trend(&self, swings: &[SwingPoint]) -> &'static str {
        if swings.len() < 4 {
            return "NEUTRAL";
        }

        let highs: Vec<&SwingPoint> = swings.iter().filter(|s| s.kind == SwingKind::High).collect();
        let lows: Vec<&SwingPoint> = swings.iter().filter(|s| s.kind == SwingKind::Low).collect();

        if highs.len() < 2 || lows.len() < 2 {
            return "NEUTRAL";
        }

        let last_high = highs[highs.len() - 1];
        let prev_high = highs[highs.len() - 2];
        let last_low = lows[lows.len() - 1];
        let prev_low = lows[lows.len() - 2];

        if last_high.price > prev_high.price && last_low.price > prev_low.price {
            "UPTREND"
        } else if last_high.price < prev_high.price && last_low.price < prev_low.price {
            "DOWNTREND"
        } else {
            "SIDEWAYS"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn swing(i: usize, price: f64, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            price,
            index: i,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::days(i as i64),
            kind,
        }
    }

    fn recognizer() -> PatternRecognizer {
        PatternRecognizer::new(PatternConfig::default())
    }

    #[test]
    fn needs_three_swings() {
        let swings = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 90.0, SwingKind::Low),
        ];
        assert!(recognizer().detect_patterns(&swings).is_empty());
    }

    #[test]
    fn double_top_within_tolerance() {
        let swings = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 90.0, SwingKind::Low),
            swing(2, 101.0, SwingKind::High),
        ];
        let patterns = recognizer().detect_patterns(&swings);
        assert!(patterns.contains(&"POTENTIAL_DOUBLE_TOP".to_string()));
    }

    #[test]
    fn distant_highs_are_not_a_double_top() {
        let swings = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 90.0, SwingKind::Low),
            swing(2, 110.0, SwingKind::High),
        ];
        assert!(recognizer().detect_patterns(&swings).is_empty());
    }

    #[test]
    fn double_top_breakout_below_neckline() {
        let swings = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 80.0, SwingKind::Low),
            swing(2, 101.0, SwingKind::High),
            swing(3, 70.0, SwingKind::Low),
        ];
        let patterns = recognizer().detect_patterns(&swings);
        assert!(patterns.contains(&"DOUBLE_TOP_BREAKOUT".to_string()));
    }

    #[test]
    fn double_bottom_breakout_above_neckline() {
        let swings = vec![
            swing(0, 80.0, SwingKind::Low),
            swing(1, 100.0, SwingKind::High),
            swing(2, 81.0, SwingKind::Low),
            swing(3, 110.0, SwingKind::High),
        ];
        let patterns = recognizer().detect_patterns(&swings);
        assert!(patterns.contains(&"DOUBLE_BOTTOM_BREAKOUT".to_string()));
    }

    #[test]
    fn head_and_shoulders_with_aligned_shoulders() {
        let swings = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 90.0, SwingKind::Low),
            swing(2, 112.0, SwingKind::High),
            swing(3, 91.0, SwingKind::Low),
            swing(4, 102.0, SwingKind::High),
        ];
        let patterns = recognizer().detect_patterns(&swings);
        assert!(patterns.contains(&"POTENTIAL_HEAD_AND_SHOULDERS".to_string()));
    }

    #[test]
    fn inverse_head_and_shoulders() {
        let swings = vec![
            swing(0, 80.0, SwingKind::Low),
            swing(1, 95.0, SwingKind::High),
            swing(2, 70.0, SwingKind::Low),
            swing(3, 96.0, SwingKind::High),
            swing(4, 81.0, SwingKind::Low),
        ];
        let patterns = recognizer().detect_patterns(&swings);
        assert!(patterns.contains(&"POTENTIAL_INVERSE_HEAD_AND_SHOULDERS".to_string()));
    }

    #[test]
    fn trend_from_swing_sequence() {
        let rec = recognizer();
        let up = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 90.0, SwingKind::Low),
            swing(2, 105.0, SwingKind::High),
            swing(3, 95.0, SwingKind::Low),
        ];
        assert_eq!(rec.detect_trend(&up), "UPTREND");

        let down = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 90.0, SwingKind::Low),
            swing(2, 95.0, SwingKind::High),
            swing(3, 85.0, SwingKind::Low),
        ];
        assert_eq!(rec.detect_trend(&down), "DOWNTREND");

        let mixed = vec![
            swing(0, 100.0, SwingKind::High),
            swing(1, 90.0, SwingKind::Low),
            swing(2, 105.0, SwingKind::High),
            swing(3, 85.0, SwingKind::Low),
        ];
        assert_eq!(rec.detect_trend(&mixed), "SIDEWAYS");
        assert_eq!(rec.detect_trend(&up[..3]), "NEUTRAL");
    }
}
