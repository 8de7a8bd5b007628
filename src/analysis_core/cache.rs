//! Per-symbol incremental analysis cache
//!
//! Bounded LRU mapping symbol -> analysis state. Each entry owns the live
//! streaming engines for its symbol, which is what makes incremental
//! reprocessing possible: feed only the unseen bars, never the full history.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use super::indicators::{IndicatorEngine, IndicatorSnapshot};
use super::swings::{SwingDetector, SwingPoint};

/// The live streaming state for one symbol. Mutable and non-reentrant: at
/// most one analysis may drive these at a time.
#[derive(Debug, Clone)]
pub struct EngineHandles {
    pub indicators: IndicatorEngine,
    pub swings: SwingDetector,
}

/// Everything cached for one symbol between analysis calls.
///
/// Owned exclusively by the cache and mutated only through the orchestrator.
/// `engines` or `snapshot` missing is an integrity failure: the orchestrator
/// rebuilds from full history instead of resuming.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    pub symbol: String,
    /// Timestamp of the last bar fed through the engines.
    pub last_updated: DateTime<Utc>,
    pub snapshot: Option<IndicatorSnapshot>,
    pub swings: Vec<SwingPoint>,
    pub last_score: f64,
    pub sentiment_score: Option<f64>,
    pub last_price: Option<f64>,
    pub engines: Option<EngineHandles>,
}

/// Least-recently-used cache with synchronous eviction. Recency is promoted
/// on both reads and writes.
#[derive(Debug)]
pub struct LruCache {
    capacity: usize,
    entries: HashMap<String, AnalysisState>,
    // Front is the next eviction candidate.
    order: VecDeque<String>,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn promote(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    pub fn get(&mut self, key: &str) -> Option<&AnalysisState> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.entries.get(key)
    }

    /// Remove and return an entry, e.g. to mutate its engines without
    /// holding a borrow of the cache. Pair with a later `put`.
    pub fn take(&mut self, key: &str) -> Option<AnalysisState> {
        let state = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(state)
    }

    pub fn put(&mut self, key: String, state: AnalysisState) {
        self.entries.insert(key.clone(), state);
        self.promote(&key);

        while self.entries.len() > self.capacity {
            // Evicted synchronously with the put that overflowed.
            if let Some(victim) = self.order.pop_front() {
                self.entries.remove(&victim);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}
