//! Daily OHLCV bar type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One daily price observation for a symbol.
///
/// A processed sequence for one symbol is strictly increasing in timestamp
/// with no duplicates; the orchestrator's incremental split enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3, the anchor price for VWAP.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
