use advisor_core::{
    Action, OpportunityAnalysis, Recommendation, RiskLevel, SignalKind,
};

/// Turns allocated opportunities into user-facing recommendations.
pub struct RecommendationBuilder {
    /// Minimum opportunity score for a recommendation.
    pub score_threshold: f64,
    /// Per-factor score above which a factor-specific reasoning sentence
    /// is emitted.
    pub reasoning_threshold: f64,
}

impl RecommendationBuilder {
    pub fn new(score_threshold: f64, reasoning_threshold: f64) -> Self {
        Self {
            score_threshold,
            reasoning_threshold,
        }
    }

    /// Build a recommendation for one allocated opportunity, or `None` when
    /// it fails the score/risk filter for the given risk profile.
    pub fn build(
        &self,
        opportunity: &OpportunityAnalysis,
        allocated_amount: f64,
        risk_level: RiskLevel,
    ) -> Option<Recommendation> {
        if opportunity.score <= self.score_threshold {
            return None;
        }
        if opportunity.risk > risk_level.max_risk() {
            tracing::debug!(
                "Dropping {}: risk {:.2} above {} ceiling {:.2}",
                opportunity.card.id,
                opportunity.risk,
                risk_level.as_str(),
                risk_level.max_risk()
            );
            return None;
        }

        // Degraded signals lower confidence in proportion to how much of
        // the factor map fell back to neutral defaults.
        let degraded = opportunity.degraded_fraction();
        let confidence = (opportunity.score * (1.0 - 0.5 * degraded)).clamp(0.0, 1.0);

        Some(Recommendation {
            card: opportunity.card.clone(),
            recommended_amount: allocated_amount,
            confidence,
            risk: opportunity.risk,
            potential_return: opportunity.potential_return,
            time_to_maturity_days: opportunity.time_to_maturity_days,
            reasoning: self.reasoning(opportunity),
            action: Action::from_score(opportunity.score),
        })
    }

    /// One sentence per factor clearing the reasoning threshold; a generic
    /// sentence when none does. Never empty.
    fn reasoning(&self, opportunity: &OpportunityAnalysis) -> Vec<String> {
        let name = &opportunity.card.name;
        let mut sentences = Vec::new();

        for (kind, result) in &opportunity.factors {
            if result.score < self.reasoning_threshold {
                continue;
            }
            let sentence = match kind {
                SignalKind::PriceTrend => {
                    format!("{name} shows a strong upward price trend over the lookback window.")
                }
                SignalKind::Volume => {
                    format!("{name} trades at healthy volume, so positions can be exited easily.")
                }
                SignalKind::Sentiment => {
                    format!("Collector sentiment around {name} is clearly positive.")
                }
                SignalKind::Technical => {
                    format!("Technical indicators for {name} favor an entry at current prices.")
                }
                SignalKind::Fundamental => format!(
                    "Rarity, edition and condition make {name} fundamentally attractive."
                ),
            };
            sentences.push(sentence);
        }

        if sentences.is_empty() {
            sentences.push(format!(
                "{name} scores well across the combined market signals without a single standout factor."
            ));
        }

        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{CardCandidate, CardGame, SignalResult};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn opportunity(score: f64, risk: f64, factor_scores: &[(SignalKind, f64)]) -> OpportunityAnalysis {
        let mut factors = BTreeMap::new();
        for (kind, s) in factor_scores {
            factors.insert(*kind, SignalResult::new(*s, json!({})));
        }
        OpportunityAnalysis {
            card: CardCandidate {
                id: "ygo-7".to_string(),
                name: "Blue-Eyes White Dragon".to_string(),
                game: CardGame::Yugioh,
                current_price: 80.0,
                rarity: Some("ultra rare".to_string()),
                edition: None,
                condition: None,
                release_date: None,
            },
            score,
            factors,
            risk,
            potential_return: 0.12,
            time_to_maturity_days: 90,
        }
    }

    fn builder() -> RecommendationBuilder {
        RecommendationBuilder::new(0.7, 0.7)
    }

    #[test]
    fn strong_score_maps_to_strong_buy() {
        let rec = builder()
            .build(&opportunity(0.85, 0.2, &[]), 1000.0, RiskLevel::Moderate)
            .expect("qualifies");
        assert_eq!(rec.action, Action::StrongBuy);
        assert_eq!(rec.recommended_amount, 1000.0);
    }

    #[test]
    fn score_at_threshold_is_rejected() {
        assert!(builder()
            .build(&opportunity(0.7, 0.2, &[]), 500.0, RiskLevel::Moderate)
            .is_none());
    }

    #[test]
    fn risk_above_profile_ceiling_is_rejected() {
        // 0.45 > MODERATE ceiling 0.40, but within AGGRESSIVE 0.60
        let opp = opportunity(0.8, 0.45, &[]);
        assert!(builder().build(&opp, 500.0, RiskLevel::Moderate).is_none());
        assert!(builder().build(&opp, 500.0, RiskLevel::Aggressive).is_some());
    }

    #[test]
    fn reasoning_lists_factors_clearing_threshold() {
        let opp = opportunity(
            0.8,
            0.2,
            &[
                (SignalKind::PriceTrend, 0.9),
                (SignalKind::Volume, 0.4),
                (SignalKind::Fundamental, 0.75),
            ],
        );
        let rec = builder().build(&opp, 500.0, RiskLevel::Moderate).unwrap();
        assert_eq!(rec.reasoning.len(), 2);
        assert!(rec.reasoning[0].contains("price trend"));
    }

    #[test]
    fn reasoning_never_empty() {
        let opp = opportunity(0.75, 0.2, &[(SignalKind::Volume, 0.5)]);
        let rec = builder().build(&opp, 500.0, RiskLevel::Moderate).unwrap();
        assert_eq!(rec.reasoning.len(), 1);
    }

    #[test]
    fn degraded_signals_reduce_confidence() {
        let mut opp = opportunity(0.8, 0.2, &[(SignalKind::Volume, 0.9)]);
        let full = builder().build(&opp, 500.0, RiskLevel::Moderate).unwrap();
        opp.factors
            .insert(SignalKind::Sentiment, SignalResult::neutral("down"));
        let degraded = builder().build(&opp, 500.0, RiskLevel::Moderate).unwrap();
        assert!(degraded.confidence < full.confidence);
    }
}
