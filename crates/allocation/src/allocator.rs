use advisor_core::RiskLevel;
use anyhow::{bail, Result};

/// Splits a total investment budget across ranked opportunities.
///
/// Base amount is an even split; a risk-dependent tilt then shifts budget
/// toward the higher-ranked (higher-score) opportunities, and the result is
/// renormalized so the amounts sum to the total exactly.
#[derive(Debug, Clone)]
pub struct Allocator {
    /// Practical cap on positions per request.
    pub max_positions: usize,
}

impl Allocator {
    pub fn new(max_positions: usize) -> Result<Self> {
        if max_positions == 0 {
            bail!("max_positions must be at least 1");
        }
        Ok(Self { max_positions })
    }

    /// One amount per rank, same order as the ranked input.
    /// `opportunity_count == 0` yields an empty allocation; the caller must
    /// handle an empty recommendation list without error.
    pub fn allocate(
        &self,
        total_amount: f64,
        risk_level: RiskLevel,
        opportunity_count: usize,
    ) -> Vec<f64> {
        let n = opportunity_count.min(self.max_positions);
        if n == 0 || total_amount <= 0.0 {
            return Vec::new();
        }

        let tilt = risk_level.allocation_tilt();

        // Rank 0 is the best opportunity and receives the largest tilt
        // multiplier; the last rank gets the flat base.
        let weights: Vec<f64> = (0..n).map(|i| 1.0 + tilt * (n - 1 - i) as f64).collect();
        let weight_sum: f64 = weights.iter().sum();

        let mut amounts: Vec<f64> = weights
            .iter()
            .map(|w| total_amount * w / weight_sum)
            .collect();

        // Fold the float residual into the top rank so the sum is exact.
        let allocated: f64 = amounts.iter().sum();
        amounts[0] += total_amount - allocated;

        amounts
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self { max_positions: 5 }
    }
}
