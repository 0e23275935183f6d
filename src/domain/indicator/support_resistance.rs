//! Support and resistance levels from local extrema.
//!
//! A bar is a swing low (support) when its low is the minimum of the
//! surrounding `window` bars on each side, and a swing high (resistance)
//! when its high is the maximum. Levels within 0.5% of an already-collected
//! level are merged. Levels are returned sorted ascending.

use crate::domain::market::PriceBar;
use serde::{Deserialize, Serialize};

const MERGE_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

pub fn find_support_resistance(bars: &[PriceBar], window: usize) -> SupportResistance {
    if window == 0 || bars.len() < 2 * window + 1 {
        return SupportResistance {
            support: Vec::new(),
            resistance: Vec::new(),
        };
    }

    let mut support = Vec::new();
    let mut resistance = Vec::new();

    for i in window..bars.len() - window {
        let neighborhood = &bars[i - window..=i + window];
        let low = bars[i].low;
        let high = bars[i].high;

        if neighborhood.iter().all(|b| b.low >= low) {
            push_merged(&mut support, low);
        }
        if neighborhood.iter().all(|b| b.high <= high) {
            push_merged(&mut resistance, high);
        }
    }

    support.sort_by(|a, b| a.total_cmp(b));
    resistance.sort_by(|a, b| a.total_cmp(b));
    SupportResistance {
        support,
        resistance,
    }
}

fn push_merged(levels: &mut Vec<f64>, level: f64) {
    let duplicate = levels
        .iter()
        .any(|&existing| (existing - level).abs() <= existing.abs() * MERGE_TOLERANCE);
    if !duplicate {
        levels.push(level);
    }
}
