use super::*;
use advisor_core::{
    Action, CardGame, MarketSentiment, PriceRange, PricePoint, RiskLevel, TechnicalSnapshot,
    TimeHorizon, VolumeStats, MIN_INVESTMENT,
};
use approx::assert_relative_eq;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-card collaborator data so each mock candidate scores differently.
#[derive(Clone)]
struct CardProfile {
    price_step: f64,
    volume: f64,
    sentiment: f64,
}

struct MockProvider {
    cards: Vec<CardCandidate>,
    profiles: HashMap<String, CardProfile>,
    failing: bool,
    trending_calls: AtomicUsize,
}

impl MockProvider {
    fn new(cards: Vec<(CardCandidate, CardProfile)>) -> Self {
        let profiles = cards
            .iter()
            .map(|(card, profile)| (card.id.clone(), profile.clone()))
            .collect();
        Self {
            cards: cards.into_iter().map(|(card, _)| card).collect(),
            profiles,
            failing: false,
            trending_calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            cards: Vec::new(),
            profiles: HashMap::new(),
            failing: true,
            trending_calls: AtomicUsize::new(0),
        }
    }

    fn fail<T>(&self) -> Result<T, AdviceError> {
        Err(AdviceError::MarketData("mock outage".to_string()))
    }

    fn profile(&self, card_id: &str) -> CardProfile {
        self.profiles.get(card_id).cloned().unwrap_or(CardProfile {
            price_step: 0.0,
            volume: 50.0,
            sentiment: 0.0,
        })
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    async fn get_trending_cards(
        &self,
        _game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError> {
        self.trending_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return self.fail();
        }
        Ok(self.cards.clone())
    }

    async fn get_undervalued_cards(
        &self,
        _game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError> {
        if self.failing {
            return self.fail();
        }
        Ok(Vec::new())
    }

    async fn get_new_releases(
        &self,
        _game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError> {
        if self.failing {
            return self.fail();
        }
        Ok(Vec::new())
    }

    async fn get_price_history(
        &self,
        card_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, AdviceError> {
        if self.failing {
            return self.fail();
        }
        let step = self.profile(card_id).price_step;
        let now = Utc::now();
        Ok((0..days)
            .map(|i| PricePoint {
                date: now - Duration::days((days - i) as i64),
                price: 100.0 + step * i as f64,
            })
            .collect())
    }

    async fn get_card_volume(&self, card_id: &str) -> Result<VolumeStats, AdviceError> {
        if self.failing {
            return self.fail();
        }
        Ok(VolumeStats {
            average: self.profile(card_id).volume,
            trend: 0.1,
        })
    }

    async fn get_market_sentiment(
        &self,
        card_id: &str,
    ) -> Result<MarketSentiment, AdviceError> {
        if self.failing {
            return self.fail();
        }
        Ok(MarketSentiment {
            sentiment: self.profile(card_id).sentiment,
            sources: 10,
        })
    }

    async fn get_technical_indicators(
        &self,
        _card_id: &str,
    ) -> Result<TechnicalSnapshot, AdviceError> {
        if self.failing {
            return self.fail();
        }
        Ok(TechnicalSnapshot {
            rsi: 25.0,
            macd: 0.5,
            ma50: 100.0,
            price: 120.0,
        })
    }
}

#[async_trait]
impl PortfolioProvider for MockProvider {
    async fn get_user_portfolio(&self, _user_id: &str) -> Result<Portfolio, AdviceError> {
        if self.failing {
            return Err(AdviceError::PortfolioData("mock outage".to_string()));
        }
        Ok(Portfolio::default())
    }
}

fn strong_card(id: &str) -> CardCandidate {
    CardCandidate {
        id: id.to_string(),
        name: format!("Card {id}"),
        game: CardGame::Pokemon,
        current_price: 120.0,
        rarity: Some("secret rare".to_string()),
        edition: Some("1st edition".to_string()),
        condition: Some("gem mint".to_string()),
        release_date: NaiveDate::from_ymd_opt(1999, 1, 9),
    }
}

/// A: top score, B: weaker sentiment, C: weaker volume. All clear the
/// recommendation threshold; A > B > C.
fn three_card_market() -> MockProvider {
    MockProvider::new(vec![
        (
            strong_card("a"),
            CardProfile {
                price_step: 2.0,
                volume: 500.0,
                sentiment: 0.9,
            },
        ),
        (
            strong_card("b"),
            CardProfile {
                price_step: 2.0,
                volume: 500.0,
                sentiment: 0.3,
            },
        ),
        (
            strong_card("c"),
            CardProfile {
                price_step: 2.0,
                volume: 60.0,
                sentiment: 0.9,
            },
        ),
    ])
}

fn single_card_market() -> MockProvider {
    MockProvider::new(vec![(
        strong_card("a"),
        CardProfile {
            price_step: 2.0,
            volume: 500.0,
            sentiment: 0.9,
        },
    )])
}

fn orchestrator(provider: MockProvider) -> AdviceOrchestrator {
    let provider = Arc::new(provider);
    AdviceOrchestrator::new(provider.clone(), provider, AdvisorConfig::default()).unwrap()
}

fn request(amount: f64, risk_level: RiskLevel) -> AdviceRequest {
    AdviceRequest {
        user_id: "u1".to_string(),
        amount,
        risk_level,
        time_horizon: TimeHorizon::Days90,
        price_range: PriceRange::All,
        card_games: vec![CardGame::Pokemon],
    }
}

#[tokio::test]
async fn validation_boundary_is_inclusive() {
    let orch = orchestrator(single_card_market());

    let rejected = orch
        .generate_investment_advice(&request(MIN_INVESTMENT - 1.0, RiskLevel::Moderate))
        .await;
    assert!(matches!(rejected, Err(AdviceError::Validation(_))));

    let accepted = orch
        .generate_investment_advice(&request(MIN_INVESTMENT, RiskLevel::Moderate))
        .await;
    assert!(accepted.is_ok());
}

#[tokio::test]
async fn allocation_never_overspends() {
    let orch = orchestrator(three_card_market());
    let response = orch
        .generate_investment_advice(&request(1000.0, RiskLevel::Moderate))
        .await
        .unwrap();

    let total: f64 = response
        .recommendations
        .iter()
        .map(|r| r.recommended_amount)
        .sum();
    assert!(total <= 1000.0 + 1e-9);
    assert_relative_eq!(total, response.total_invested, epsilon = 1e-9);
}

#[tokio::test]
async fn single_strong_opportunity_gets_full_budget() {
    let orch = orchestrator(single_card_market());
    let response = orch
        .generate_investment_advice(&request(1000.0, RiskLevel::Moderate))
        .await
        .unwrap();

    assert_eq!(response.recommendations.len(), 1);
    let rec = &response.recommendations[0];
    assert_eq!(rec.action, Action::StrongBuy);
    assert_relative_eq!(rec.recommended_amount, 1000.0, epsilon = 1e-9);
    assert!(rec.risk <= RiskLevel::Moderate.max_risk());
    assert!(response.risk.is_within_tolerance);
    assert!(response.confidence > 0.0);
}

#[tokio::test]
async fn aggressive_tilt_assigns_strictly_decreasing_amounts() {
    let orch = orchestrator(three_card_market());
    let response = orch
        .generate_investment_advice(&request(1000.0, RiskLevel::Aggressive))
        .await
        .unwrap();

    assert_eq!(response.recommendations.len(), 3);

    // Ranked by descending score: a, b, c.
    let ids: Vec<&str> = response
        .recommendations
        .iter()
        .map(|r| r.card.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let amounts: Vec<f64> = response
        .recommendations
        .iter()
        .map(|r| r.recommended_amount)
        .collect();
    assert!(amounts[0] > amounts[1] && amounts[1] > amounts[2]);
    assert_relative_eq!(amounts.iter().sum::<f64>(), 1000.0, epsilon = 1e-9);
}

#[tokio::test]
async fn action_monotonic_across_recommendations() {
    let orch = orchestrator(three_card_market());
    let response = orch
        .generate_investment_advice(&request(1000.0, RiskLevel::Aggressive))
        .await
        .unwrap();

    for pair in response.recommendations.windows(2) {
        assert!(pair[0].confidence >= 0.0);
        assert!(
            pair[0].action.rank() >= pair[1].action.rank(),
            "higher-scored recommendation has weaker action"
        );
    }
}

#[tokio::test]
async fn collaborator_outage_yields_empty_but_well_formed_response() {
    let orch = orchestrator(MockProvider::failing());
    let response = orch
        .generate_investment_advice(&request(1000.0, RiskLevel::Conservative))
        .await
        .unwrap();

    assert!(response.recommendations.is_empty());
    assert_eq!(response.total_invested, 0.0);
    assert_eq!(response.confidence, 0.0);
    assert!(response.message.is_some());
    assert!(response.risk.is_within_tolerance);
}

#[tokio::test]
async fn price_range_filter_can_exclude_everything() {
    let orch = orchestrator(single_card_market());
    let mut req = request(1000.0, RiskLevel::Moderate);
    req.price_range = PriceRange::Budget; // all mock cards cost 120
    let response = orch.generate_investment_advice(&req).await.unwrap();

    assert!(response.recommendations.is_empty());
    assert!(response.message.is_some());
}

#[tokio::test]
async fn repeated_request_is_served_from_cache() {
    let orch = orchestrator(single_card_market());
    let req = request(1000.0, RiskLevel::Moderate);

    let first = orch.generate_investment_advice(&req).await.unwrap();
    let second = orch.generate_investment_advice(&req).await.unwrap();
    assert_eq!(first.generated_at, second.generated_at);
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_computation() {
    let provider = Arc::new(single_card_market());
    let orch =
        AdviceOrchestrator::new(provider.clone(), provider.clone(), AdvisorConfig::default())
            .unwrap();
    let req = request(1000.0, RiskLevel::Moderate);

    let (first, second) = tokio::join!(
        orch.generate_investment_advice(&req),
        orch.generate_investment_advice(&req),
    );
    assert!(first.is_ok() && second.is_ok());
    assert_eq!(provider.trending_calls.load(Ordering::SeqCst), 1);
}
