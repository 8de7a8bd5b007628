//! Swing structure detection
//!
//! A two-mode state machine tracking one potential extreme at a time. A
//! potential high is only confirmed once price has pulled back `threshold`
//! against it, so every emitted pivot lags the true extreme by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bars::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed local price extreme. Immutable once emitted; swing history is
/// append-only and chronologically ordered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub price: f64,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub kind: SwingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Up,
    Down,
}

/// Streaming swing detector.
///
/// Owns its own bar counter so indices stay consistent when history is fed
/// across multiple incremental calls.
#[derive(Debug, Clone)]
pub struct SwingDetector {
    threshold: f64,
    // Mode plus the unconfirmed extreme currently being tracked.
    state: Option<(Mode, SwingPoint)>,
    bar_count: usize,
}

impl SwingDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: None,
            bar_count: 0,
        }
    }

    fn point(bar: &Bar, index: usize, kind: SwingKind) -> SwingPoint {
        SwingPoint {
            price: match kind {
                SwingKind::High => bar.high,
                SwingKind::Low => bar.low,
            },
            index,
            timestamp: bar.timestamp,
            kind,
        }
    }

    /// Process one bar; returns a swing point only on the reversal bar that
    /// confirms it.
    pub fn update(&mut self, bar: &Bar) -> Option<SwingPoint> {
        let index = self.bar_count;
        self.bar_count += 1;

        let Some((mode, potential)) = self.state else {
            // First bar seeds an up-mode potential high.
            self.state = Some((Mode::Up, Self::point(bar, index, SwingKind::High)));
            return None;
        };

        let mut confirmed = None;

        match mode {
            Mode::Up => {
                if bar.high > potential.price {
                    self.state = Some((Mode::Up, Self::point(bar, index, SwingKind::High)));
                } else if bar.low < potential.price * (1.0 - self.threshold) {
                    confirmed = Some(potential);
                    self.state = Some((Mode::Down, Self::point(bar, index, SwingKind::Low)));
                }
            }
            Mode::Down => {
                if bar.low < potential.price {
                    self.state = Some((Mode::Down, Self::point(bar, index, SwingKind::Low)));
                } else if bar.high > potential.price * (1.0 + self.threshold) {
                    confirmed = Some(potential);
                    self.state = Some((Mode::Up, Self::point(bar, index, SwingKind::High)));
                }
            }
        }

        confirmed
    }
}
