use advisor_core::{
    AdviceError, CardCandidate, MarketDataProvider, OpportunityAnalysis, SignalKind,
    SignalResult, SignalWeights, TimeHorizon,
};
use signal_analysis::SignalEngines;
use std::collections::BTreeMap;

/// Annualized upside assumed for a perfect score; potential return scales
/// linearly with score and horizon from this ceiling.
const MAX_ANNUAL_RETURN: f64 = 0.5;

/// Combines the five signal analyzer outputs into one opportunity score and
/// risk estimate per candidate card.
pub struct OpportunityScorer {
    engines: SignalEngines,
    weights: SignalWeights,
    score_cutoff: f64,
}

impl OpportunityScorer {
    pub fn new(
        weights: SignalWeights,
        reference_volume: f64,
        score_cutoff: f64,
    ) -> Result<Self, AdviceError> {
        weights.validate()?;
        Ok(Self {
            engines: SignalEngines::new(reference_volume),
            weights,
            score_cutoff,
        })
    }

    fn weight_for(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::PriceTrend => self.weights.price_trend,
            SignalKind::Volume => self.weights.volume,
            SignalKind::Sentiment => self.weights.sentiment,
            SignalKind::Technical => self.weights.technical,
            SignalKind::Fundamental => self.weights.fundamental,
        }
    }

    /// Weighted opportunity score plus risk, both clamped to [0, 1].
    ///
    /// Risk is the unweighted mean of `1 - score` per factor, except the
    /// price-trend factor, which contributes its own return volatility
    /// instead of its score complement.
    pub fn combine(&self, factors: &BTreeMap<SignalKind, SignalResult>) -> (f64, f64) {
        let mut score = 0.0;
        let mut risk_terms = Vec::with_capacity(factors.len());

        for (kind, result) in factors {
            let factor_score = result.score.clamp(0.0, 1.0);
            score += factor_score * self.weight_for(*kind);

            if *kind == SignalKind::PriceTrend {
                let volatility = result
                    .metrics
                    .get("volatility")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(1.0 - factor_score);
                risk_terms.push(volatility.clamp(0.0, 1.0));
            } else {
                risk_terms.push(1.0 - factor_score);
            }
        }

        let risk = if risk_terms.is_empty() {
            0.5
        } else {
            risk_terms.iter().sum::<f64>() / risk_terms.len() as f64
        };

        (score.clamp(0.0, 1.0), risk.clamp(0.0, 1.0))
    }

    /// Score one candidate card. Pure given fixed analyzer outputs: calling
    /// twice with identical collaborator responses yields identical analyses.
    pub async fn score_card(
        &self,
        market: &dyn MarketDataProvider,
        card: CardCandidate,
        horizon: TimeHorizon,
        lookback_days: u32,
    ) -> OpportunityAnalysis {
        let factors = self.engines.analyze_all(market, &card, lookback_days).await;
        let (score, risk) = self.combine(&factors);

        let horizon_fraction = horizon.days() as f64 / 365.0;
        let potential_return = score * MAX_ANNUAL_RETURN * horizon_fraction;

        tracing::debug!(
            "Scored {} ({}): score {:.3}, risk {:.3}",
            card.name,
            card.id,
            score,
            risk
        );

        OpportunityAnalysis {
            card,
            score,
            factors,
            risk,
            potential_return,
            time_to_maturity_days: horizon.days(),
        }
    }

    /// Drop candidates at or below the score cutoff and rank the rest by
    /// descending score. The sort is stable, so output order depends only on
    /// analyzer outputs, never on completion order of concurrent calls.
    pub fn filter_and_rank(
        &self,
        mut analyses: Vec<OpportunityAnalysis>,
    ) -> Vec<OpportunityAnalysis> {
        analyses.retain(|a| a.score > self.score_cutoff);
        analyses.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        analyses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::{CardGame, MarketSentiment, PricePoint, TechnicalSnapshot, VolumeStats};
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn scorer() -> OpportunityScorer {
        OpportunityScorer::new(SignalWeights::default(), 100.0, 0.6).unwrap()
    }

    fn card(id: &str) -> CardCandidate {
        CardCandidate {
            id: id.to_string(),
            name: format!("Card {id}"),
            game: CardGame::Mtg,
            current_price: 50.0,
            rarity: Some("rare".to_string()),
            edition: None,
            condition: Some("near mint".to_string()),
            release_date: None,
        }
    }

    fn analysis(id: &str, score: f64) -> OpportunityAnalysis {
        OpportunityAnalysis {
            card: card(id),
            score,
            factors: BTreeMap::new(),
            risk: 0.3,
            potential_return: 0.1,
            time_to_maturity_days: 90,
        }
    }

    fn factors(scores: [f64; 5], volatility: f64) -> BTreeMap<SignalKind, SignalResult> {
        let mut map = BTreeMap::new();
        map.insert(
            SignalKind::PriceTrend,
            SignalResult::new(scores[0], json!({ "volatility": volatility })),
        );
        map.insert(SignalKind::Volume, SignalResult::new(scores[1], json!({})));
        map.insert(SignalKind::Sentiment, SignalResult::new(scores[2], json!({})));
        map.insert(SignalKind::Technical, SignalResult::new(scores[3], json!({})));
        map.insert(SignalKind::Fundamental, SignalResult::new(scores[4], json!({})));
        map
    }

    #[test]
    fn combine_applies_fixed_weights() {
        let (score, _) = scorer().combine(&factors([1.0, 0.0, 0.0, 0.0, 0.0], 0.0));
        assert_relative_eq!(score, 0.25, epsilon = 1e-9);
        let (score, _) = scorer().combine(&factors([0.0, 0.0, 1.0, 0.0, 0.0], 0.0));
        assert_relative_eq!(score, 0.15, epsilon = 1e-9);
    }

    #[test]
    fn risk_uses_trend_volatility_not_score() {
        // All non-price factors perfect, price trend volatile: only the
        // volatility term drives risk.
        let (_, risk) = scorer().combine(&factors([1.0, 1.0, 1.0, 1.0, 1.0], 0.6));
        assert_relative_eq!(risk, 0.12, epsilon = 1e-9);
    }

    #[test]
    fn combine_clamps_fuzzed_out_of_range_inputs() {
        // Simple xorshift so the fuzz loop is deterministic.
        let mut state: u64 = 0x9e3779b97f4a7c15;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            // Spread across [-2, 3] to include out-of-range scores.
            (state % 5000) as f64 / 1000.0 - 2.0
        };

        let s = scorer();
        for _ in 0..200 {
            let raw = [next(), next(), next(), next(), next()];
            // Bypass the clamping constructor the way a hostile
            // deserialized payload would.
            let mut map = BTreeMap::new();
            for (i, kind) in [
                SignalKind::PriceTrend,
                SignalKind::Volume,
                SignalKind::Sentiment,
                SignalKind::Technical,
                SignalKind::Fundamental,
            ]
            .into_iter()
            .enumerate()
            {
                let result: SignalResult = serde_json::from_value(json!({
                    "score": raw[i],
                    "degraded": false,
                    "metrics": { "volatility": next() },
                }))
                .unwrap();
                map.insert(kind, result);
            }
            let (score, risk) = s.combine(&map);
            assert!((0.0..=1.0).contains(&score), "score {score} out of range");
            assert!((0.0..=1.0).contains(&risk), "risk {risk} out of range");
        }
    }

    #[test]
    fn filter_drops_cutoff_and_sorts_descending() {
        let ranked = scorer().filter_and_rank(vec![
            analysis("a", 0.65),
            analysis("b", 0.9),
            analysis("c", 0.6), // at cutoff: discarded
            analysis("d", 0.75),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|a| a.card.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    struct FixedMarket;

    #[async_trait]
    impl MarketDataProvider for FixedMarket {
        async fn get_trending_cards(
            &self,
            _game: CardGame,
        ) -> Result<Vec<CardCandidate>, AdviceError> {
            Ok(vec![])
        }

        async fn get_undervalued_cards(
            &self,
            _game: CardGame,
        ) -> Result<Vec<CardCandidate>, AdviceError> {
            Ok(vec![])
        }

        async fn get_new_releases(
            &self,
            _game: CardGame,
        ) -> Result<Vec<CardCandidate>, AdviceError> {
            Ok(vec![])
        }

        async fn get_price_history(
            &self,
            _card_id: &str,
            days: u32,
        ) -> Result<Vec<PricePoint>, AdviceError> {
            let now = Utc::now();
            Ok((0..days)
                .map(|i| PricePoint {
                    date: now - Duration::days((days - i) as i64),
                    price: 40.0 + 0.5 * i as f64,
                })
                .collect())
        }

        async fn get_card_volume(&self, _card_id: &str) -> Result<VolumeStats, AdviceError> {
            Ok(VolumeStats {
                average: 60.0,
                trend: 0.05,
            })
        }

        async fn get_market_sentiment(
            &self,
            _card_id: &str,
        ) -> Result<MarketSentiment, AdviceError> {
            Ok(MarketSentiment {
                sentiment: 0.3,
                sources: 7,
            })
        }

        async fn get_technical_indicators(
            &self,
            _card_id: &str,
        ) -> Result<TechnicalSnapshot, AdviceError> {
            Ok(TechnicalSnapshot {
                rsi: 45.0,
                macd: 0.1,
                ma50: 48.0,
                price: 52.0,
            })
        }
    }

    #[tokio::test]
    async fn scoring_is_idempotent_for_fixed_collaborators() {
        let s = scorer();
        let market = FixedMarket;
        let first = s
            .score_card(&market, card("x"), TimeHorizon::Days90, 30)
            .await;
        let second = s
            .score_card(&market, card("x"), TimeHorizon::Days90, 30)
            .await;
        assert_eq!(first.score, second.score);
        assert_eq!(first.risk, second.risk);
        assert_eq!(first.potential_return, second.potential_return);
        assert_eq!(
            serde_json::to_string(&first.factors).unwrap(),
            serde_json::to_string(&second.factors).unwrap()
        );
    }
}
