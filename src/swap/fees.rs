use crate::error::{Result, SwapError};

const ROUNDING_DECIMALS: i32 = 7;
const PPM: u128 = 1_000_000;

/// Exponential fee-rate ramp used while racing a timeout.
///
/// The rate starts at `base_fee` when `cursor` is zero and grows
/// geometrically to `base_fee * multiplier` once `cursor` reaches `before`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeCurve {
    /// Blocks between the start of the ramp and the deadline.
    pub before: u32,
    /// Blocks elapsed since the start of the ramp.
    pub cursor: u32,
    pub base_fee: f64,
    pub multiplier: f64,
}

impl FeeCurve {
    pub fn new(before: u32, cursor: u32, multiplier: f64) -> Self {
        Self {
            before,
            cursor,
            base_fee: 1.0,
            multiplier,
        }
    }

    pub fn with_base_fee(mut self, base_fee: f64) -> Self {
        self.base_fee = base_fee;
        self
    }

    pub fn rate(&self) -> Result<f64> {
        if self.before == 0 || !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(SwapError::InvalidFeeCurveParameters {
                before: self.before,
                multiplier: self.multiplier,
            });
        }

        let growth = self.multiplier.powf(1.0 / f64::from(self.before));
        let steps = self.before.min(self.cursor);
        let rate = round_to(self.base_fee * growth.powf(f64::from(steps)), ROUNDING_DECIMALS);

        Ok(rate.max(1.0))
    }
}

pub fn fee_rate(before: u32, cursor: u32, base_fee: f64, multiplier: f64) -> Result<f64> {
    FeeCurve::new(before, cursor, multiplier)
        .with_base_fee(base_fee)
        .rate()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Service fee for a swap-in: a flat `base_fee` plus `fee_rate` parts per
/// million of `tokens`, rounded down.
pub fn swap_in_fee(base_fee: u64, fee_rate: u64, tokens: u64) -> u64 {
    let proportional = u128::from(tokens) * u128::from(fee_rate) / PPM;
    base_fee.saturating_add(u64::try_from(proportional).unwrap_or(u64::MAX))
}
