//! Volume-synchronized probability of informed trading.
//!
//! Trades accumulate into fixed-volume buckets; each full bucket contributes
//! its absolute buy/sell imbalance to a rolling window, and
//! `VPIN = Σ|imbalance| / (window × bucket_volume)`. A single oversized
//! trade may close several buckets in one call, so the update is O(1)
//! amortized.

use std::collections::VecDeque;

use crate::error::IndicatorError;

/// Slack absorbing float drift when judging a bucket full.
const BUCKET_EPS: f64 = 1e-9;

pub struct VpinCalculator {
    bucket_volume: f64,
    window: usize,
    filled: f64,
    buy_volume: f64,
    sell_volume: f64,
    imbalances: VecDeque<f64>,
    imbalance_sum: f64,
}

impl VpinCalculator {
    pub fn new(bucket_volume: f64, window: usize) -> Result<Self, IndicatorError> {
        if !bucket_volume.is_finite() || bucket_volume <= 0.0 {
            return Err(IndicatorError::InvalidParameter {
                name: "bucket_volume",
                reason: format!("{} is not positive and finite", bucket_volume),
            });
        }
        if window == 0 {
            return Err(IndicatorError::InvalidParameter {
                name: "window",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            bucket_volume,
            window,
            filled: 0.0,
            buy_volume: 0.0,
            sell_volume: 0.0,
            imbalances: VecDeque::with_capacity(window),
            imbalance_sum: 0.0,
        })
    }

    /// Clear all buckets and the rolling window.
    pub fn reset(&mut self) {
        self.filled = 0.0;
        self.buy_volume = 0.0;
        self.sell_volume = 0.0;
        self.imbalances.clear();
        self.imbalance_sum = 0.0;
    }

    /// Feed one trade as signed volume: positive for buyer-initiated,
    /// negative for seller-initiated.
    ///
    /// Returns the current VPIN, or `None` until the window has filled.
    pub fn update_signed_volume(&mut self, signed_volume: f64) -> Result<Option<f64>, IndicatorError> {
        if !signed_volume.is_finite() {
            return Err(IndicatorError::NonFiniteInput { name: "signed_volume" });
        }
        if signed_volume != 0.0 {
            self.consume(signed_volume);
        }
        Ok(self.current())
    }

    /// Feed a volume bar pre-split into buy and sell parts (e.g. from
    /// [`bulk_volume_split`]).
    pub fn update_split_volume(&mut self, buy: f64, sell: f64) -> Result<Option<f64>, IndicatorError> {
        if !buy.is_finite() || !sell.is_finite() {
            return Err(IndicatorError::NonFiniteInput { name: "split volume" });
        }
        if buy > 0.0 {
            self.consume(buy);
        }
        if sell > 0.0 {
            self.consume(-sell);
        }
        Ok(self.current())
    }

    /// Completed buckets currently in the window.
    pub fn buckets_ready(&self) -> usize {
        self.imbalances.len()
    }

    pub fn bucket_volume(&self) -> f64 {
        self.bucket_volume
    }

    /// Current VPIN, `None` until `window` buckets have completed.
    pub fn current(&self) -> Option<f64> {
        if self.imbalances.len() < self.window {
            return None;
        }
        Some(self.imbalance_sum / (self.bucket_volume * self.window as f64))
    }

    fn consume(&mut self, signed_volume: f64) {
        let is_buy = signed_volume > 0.0;
        let mut remaining = signed_volume.abs();

        while remaining > 0.0 {
            if self.bucket_is_full() {
                self.finalize_bucket();
                continue;
            }

            let space = (self.bucket_volume - self.filled).max(0.0);
            let take = remaining.min(space);
            if take <= 0.0 {
                self.finalize_bucket();
                continue;
            }

            if is_buy {
                self.buy_volume += take;
            } else {
                self.sell_volume += take;
            }
            self.filled += take;
            remaining -= take;

            if self.bucket_is_full() {
                self.finalize_bucket();
            }
        }
    }

    fn bucket_is_full(&self) -> bool {
        self.bucket_volume - self.filled <= BUCKET_EPS
    }

    fn finalize_bucket(&mut self) {
        if self.filled <= 0.0 {
            return;
        }
        let imbalance = (self.buy_volume - self.sell_volume).abs();
        self.imbalances.push_back(imbalance);
        self.imbalance_sum += imbalance;
        if self.imbalances.len() > self.window {
            if let Some(oldest) = self.imbalances.pop_front() {
                self.imbalance_sum -= oldest;
            }
        }
        self.buy_volume = 0.0;
        self.sell_volume = 0.0;
        self.filled = 0.0;
    }
}

/// Bulk volume classification: split a volume bar into buy and sell parts
/// from the standardized price change over the bar.
///
/// `buy = volume × Φ(Δp / σ)`, the rest is sell. With `σ <= 0` or a flat
/// price the split is even.
pub fn bulk_volume_split(volume: f64, price_change: f64, sigma: f64) -> (f64, f64) {
    let buy_fraction = if sigma > 0.0 {
        normal_cdf(price_change / sigma)
    } else {
        0.5
    };
    let buy = volume * buy_fraction;
    (buy, volume - buy)
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26, max absolute error 1.5e-7.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}
