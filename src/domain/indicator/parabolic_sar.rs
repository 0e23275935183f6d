//! Parabolic SAR (stop and reverse).
//!
//! Classic Wilder construction: the SAR accelerates toward price by an
//! acceleration factor that starts at `af_step`, grows by `af_step` on every
//! new extreme point, and caps at `af_max`. Crossing the SAR flips the trend
//! and resets the factor. Output starts at the second bar (`len - 1` values).

use crate::domain::market::PriceBar;

pub fn parabolic_sar(bars: &[PriceBar], af_step: f64, af_max: f64) -> Vec<f64> {
    if bars.len() < 2 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(bars.len() - 1);

    let mut uptrend = bars[1].close >= bars[0].close;
    let mut sar = if uptrend { bars[0].low } else { bars[0].high };
    let mut extreme = if uptrend { bars[0].high } else { bars[0].low };
    let mut af = af_step;

    for bar in &bars[1..] {
        sar += af * (extreme - sar);

        if uptrend {
            if bar.low < sar {
                // Reversal: SAR jumps to the prior extreme
                uptrend = false;
                sar = extreme;
                extreme = bar.low;
                af = af_step;
            } else if bar.high > extreme {
                extreme = bar.high;
                af = (af + af_step).min(af_max);
            }
        } else if bar.high > sar {
            uptrend = true;
            sar = extreme;
            extreme = bar.high;
            af = af_step;
        } else if bar.low < extreme {
            extreme = bar.low;
            af = (af + af_step).min(af_max);
        }

        out.push(sar);
    }

    out
}
