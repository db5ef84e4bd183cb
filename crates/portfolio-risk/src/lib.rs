use advisor_core::{
    AdviceError, Portfolio, Recommendation, RiskAssessment, RiskCategory, RiskLevel,
    RiskWeights,
};
use std::collections::BTreeMap;

/// Baseline regulatory risk for collectibles markets.
const REGULATORY_BASELINE: f64 = 0.2;

/// Sub-risk preset used by the degraded default assessment. Low enough to
/// satisfy every profile's tolerance ceiling.
const DEFAULT_SUB_RISK: f64 = 0.2;

/// Herfindahl-Hirschman Index over allocation amounts: sum of squared
/// weights. 1.0 for a single position, ~1/n for n equal positions.
pub fn hhi(amounts: &[f64]) -> f64 {
    let total: f64 = amounts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    amounts
        .iter()
        .map(|a| {
            let w = a / total;
            w * w
        })
        .sum()
}

/// Combines recommendation-level risk with the user's existing holdings into
/// one assessment against the profile's tolerance ceiling.
pub struct PortfolioRiskAssessor {
    weights: RiskWeights,
}

impl PortfolioRiskAssessor {
    pub fn new(weights: RiskWeights) -> Result<Self, AdviceError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Assess a recommendation set. Infallible: an empty set falls back to
    /// the documented default assessment instead of failing the request,
    /// matching the signal-analyzer degrade policy.
    pub fn assess(
        &self,
        recommendations: &[Recommendation],
        risk_level: RiskLevel,
        portfolio: &Portfolio,
    ) -> RiskAssessment {
        if recommendations.is_empty() {
            return Self::default_assessment(risk_level);
        }

        let n = recommendations.len() as f64;
        let mean_risk = recommendations.iter().map(|r| r.risk).sum::<f64>() / n;
        let max_risk = recommendations
            .iter()
            .map(|r| r.risk)
            .fold(0.0_f64, f64::max);

        let market = mean_risk.clamp(0.0, 1.0);

        // Longer holds are harder to exit at a fair price.
        let liquidity = (recommendations
            .iter()
            .map(|r| r.time_to_maturity_days as f64 / 365.0)
            .sum::<f64>()
            / n)
            .clamp(0.0, 1.0);

        let amounts: Vec<f64> = recommendations
            .iter()
            .map(|r| r.recommended_amount)
            .collect();
        let concentration = hhi(&amounts).clamp(0.0, 1.0);

        // Blend the riskiest pick with the risk already carried by the
        // existing holdings.
        let volatility = (0.6 * max_risk + 0.4 * portfolio.risk_level).clamp(0.0, 1.0);

        let regulatory = REGULATORY_BASELINE;

        let mut breakdown = BTreeMap::new();
        breakdown.insert(RiskCategory::Market, market);
        breakdown.insert(RiskCategory::Liquidity, liquidity);
        breakdown.insert(RiskCategory::Concentration, concentration);
        breakdown.insert(RiskCategory::Volatility, volatility);
        breakdown.insert(RiskCategory::Regulatory, regulatory);

        let overall_risk = (self.weights.market * market
            + self.weights.liquidity * liquidity
            + self.weights.concentration * concentration
            + self.weights.volatility * volatility
            + self.weights.regulatory * regulatory)
            .clamp(0.0, 1.0);

        let risk_tolerance = risk_level.max_risk();
        let is_within_tolerance = overall_risk <= risk_tolerance;

        if !is_within_tolerance {
            tracing::warn!(
                "Overall risk {:.3} exceeds {} tolerance {:.2}",
                overall_risk,
                risk_level.as_str(),
                risk_tolerance
            );
        }

        let risk_mitigation = Self::mitigation(&breakdown_snapshot(&breakdown));

        RiskAssessment {
            overall_risk,
            max_risk,
            risk_tolerance,
            is_within_tolerance,
            risk_breakdown: breakdown,
            risk_mitigation,
        }
    }

    /// Default assessment for the degraded path: all sub-risks preset,
    /// tolerance satisfied.
    pub fn default_assessment(risk_level: RiskLevel) -> RiskAssessment {
        let mut breakdown = BTreeMap::new();
        for category in [
            RiskCategory::Market,
            RiskCategory::Liquidity,
            RiskCategory::Concentration,
            RiskCategory::Volatility,
            RiskCategory::Regulatory,
        ] {
            breakdown.insert(category, DEFAULT_SUB_RISK);
        }
        let risk_tolerance = risk_level.max_risk();
        RiskAssessment {
            overall_risk: DEFAULT_SUB_RISK,
            max_risk: DEFAULT_SUB_RISK,
            risk_tolerance,
            is_within_tolerance: DEFAULT_SUB_RISK <= risk_tolerance,
            risk_breakdown: breakdown,
            risk_mitigation: vec![
                "No open recommendations to assess; risk defaults applied.".to_string(),
            ],
        }
    }

    fn mitigation(breakdown: &[(RiskCategory, f64)]) -> Vec<String> {
        let mut tips = Vec::new();
        for (category, value) in breakdown {
            if *value <= 0.5 {
                continue;
            }
            let tip = match category {
                RiskCategory::Market => {
                    "Overall market risk is elevated; consider a smaller total stake."
                }
                RiskCategory::Liquidity => {
                    "Long holding periods reduce exit flexibility; keep a cash reserve."
                }
                RiskCategory::Concentration => {
                    "Allocation is concentrated in few cards; spread the budget wider."
                }
                RiskCategory::Volatility => {
                    "Price volatility is high; stagger purchases over time."
                }
                RiskCategory::Regulatory => {
                    "Watch for marketplace policy changes affecting resale."
                }
            };
            tips.push(tip.to_string());
        }
        if tips.is_empty() {
            tips.push("Risk profile is balanced; no specific mitigation required.".to_string());
        }
        tips
    }
}

fn breakdown_snapshot(breakdown: &BTreeMap<RiskCategory, f64>) -> Vec<(RiskCategory, f64)> {
    breakdown.iter().map(|(k, v)| (*k, *v)).collect()
}
