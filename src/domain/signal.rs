//! Trading signals emitted by strategies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directional opinion of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

/// A strategy's opinion on one symbol at one point in time. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    /// 0–100.
    pub strength: f64,
    /// 0.0–1.0.
    pub confidence: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// Originating strategy identifier.
    pub strategy: String,
    pub reason: String,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

/// Several strategies' opinions on one symbol merged into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedSignal {
    pub symbol: String,
    pub kind: SignalKind,
    pub strength: f64,
    /// Strength-weighted average of the contributors' confidence.
    pub confidence: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub contributors: Vec<String>,
    pub reason: String,
}

impl From<Signal> for ConsolidatedSignal {
    fn from(s: Signal) -> Self {
        ConsolidatedSignal {
            symbol: s.symbol,
            kind: s.kind,
            strength: s.strength,
            confidence: s.confidence,
            price: s.price,
            timestamp: s.timestamp,
            contributors: vec![s.strategy],
            reason: s.reason,
        }
    }
}
