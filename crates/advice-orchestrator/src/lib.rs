use advisor_core::{
    AdviceError, AdviceRequest, AdviceResponse, AdvisorConfig, CardCandidate,
    MarketDataProvider, OpportunityAnalysis, Portfolio, PortfolioProvider, Recommendation,
};
use allocation::{Allocator, RecommendationBuilder};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use notification_service::{Alert, AlertType, NotificationService};
use opportunity_scorer::OpportunityScorer;
use portfolio_risk::PortfolioRiskAssessor;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Upper bound on candidates scored per request, across all sources.
const MAX_CANDIDATES: usize = 20;

/// Internal cache entry with timestamp.
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Sequences the advice pipeline per request:
/// validate -> fetch portfolio -> fetch opportunities -> score each ->
/// allocate -> build recommendations -> assess risk -> assemble response.
///
/// Only input validation aborts a request; every downstream collaborator
/// failure degrades to documented defaults.
pub struct AdviceOrchestrator {
    market: Arc<dyn MarketDataProvider>,
    portfolio: Arc<dyn PortfolioProvider>,
    scorer: OpportunityScorer,
    allocator: Allocator,
    builder: RecommendationBuilder,
    assessor: PortfolioRiskAssessor,
    notifier: Option<NotificationService>,
    config: AdvisorConfig,
    /// Cache advice responses per request fingerprint (TTL from config).
    advice_cache: DashMap<String, CacheEntry<AdviceResponse>>,
    /// Per-fingerprint in-flight markers: concurrent requests for the same
    /// fingerprint share one computation instead of racing.
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl AdviceOrchestrator {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        portfolio: Arc<dyn PortfolioProvider>,
        config: AdvisorConfig,
    ) -> Result<Self, AdviceError> {
        config.validate()?;

        let scorer = OpportunityScorer::new(
            config.signal_weights,
            config.reference_volume,
            config.score_cutoff,
        )?;
        let allocator = Allocator::new(config.max_positions)
            .map_err(|e| AdviceError::Config(e.to_string()))?;
        let builder = RecommendationBuilder::new(
            config.recommendation_threshold,
            config.reasoning_threshold,
        );
        let assessor = PortfolioRiskAssessor::new(config.risk_weights)?;

        Ok(Self {
            market,
            portfolio,
            scorer,
            allocator,
            builder,
            assessor,
            notifier: None,
            config,
            advice_cache: DashMap::new(),
            in_flight: DashMap::new(),
        })
    }

    /// Attach a notification service for fire-and-forget advice alerts.
    pub fn with_notifier(mut self, notifier: NotificationService) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Generate investment advice for one request.
    ///
    /// Returns `AdviceError::Validation` for invalid input; for valid input
    /// the caller always receives a well-formed response, never a partial
    /// structure.
    pub async fn generate_investment_advice(
        &self,
        request: &AdviceRequest,
    ) -> Result<AdviceResponse, AdviceError> {
        if let Err(e) = request.validate() {
            self.notify_failure(&request.user_id, &e.to_string());
            return Err(e);
        }

        let key = request.fingerprint();
        if let Some(cached) = self.cache_lookup(&key) {
            tracing::debug!("Advice cache hit for {}", key);
            return Ok(cached);
        }

        // At-most-one concurrent computation per fingerprint: later arrivals
        // wait on the marker, then serve the freshly cached response.
        let marker = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = marker.lock().await;

        if let Some(cached) = self.cache_lookup(&key) {
            tracing::debug!("Advice computed by concurrent request for {}", key);
            return Ok(cached);
        }

        let response = self.compute_advice(request).await;

        self.advice_cache.insert(
            key.clone(),
            CacheEntry {
                data: response.clone(),
                cached_at: Utc::now(),
            },
        );
        drop(_guard);
        self.in_flight.remove(&key);

        self.notify_success(&request.user_id, &response);
        Ok(response)
    }

    fn cache_lookup(&self, key: &str) -> Option<AdviceResponse> {
        let entry = self.advice_cache.get(key)?;
        let age = (Utc::now() - entry.cached_at).num_seconds();
        if age < self.config.cache_ttl_secs {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    /// The degrade-only portion of the pipeline: every step past validation.
    async fn compute_advice(&self, request: &AdviceRequest) -> AdviceResponse {
        tracing::info!(
            "Generating advice for {} (amount {:.2}, {}, {} days)",
            request.user_id,
            request.amount,
            request.risk_level.as_str(),
            request.time_horizon.days()
        );

        let portfolio = match self.portfolio.get_user_portfolio(&request.user_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Portfolio unavailable for {}: {}", request.user_id, e);
                Portfolio::default()
            }
        };

        let candidates = self.fetch_candidates(request).await;
        tracing::info!("Fetched {} candidate cards", candidates.len());

        let analyses: Vec<OpportunityAnalysis> = join_all(candidates.into_iter().map(|card| {
            self.scorer.score_card(
                &*self.market,
                card,
                request.time_horizon,
                self.config.lookback_days,
            )
        }))
        .await;

        let ranked = self.scorer.filter_and_rank(analyses);
        let amounts = self
            .allocator
            .allocate(request.amount, request.risk_level, ranked.len());

        let recommendations: Vec<Recommendation> = ranked
            .iter()
            .zip(amounts.iter())
            .filter_map(|(opportunity, amount)| {
                self.builder.build(opportunity, *amount, request.risk_level)
            })
            .collect();

        let risk = self
            .assessor
            .assess(&recommendations, request.risk_level, &portfolio);

        let total_invested: f64 = recommendations.iter().map(|r| r.recommended_amount).sum();
        let confidence = if recommendations.is_empty() {
            0.0
        } else {
            recommendations.iter().map(|r| r.confidence).sum::<f64>()
                / recommendations.len() as f64
        };

        let message = if recommendations.is_empty() {
            Some(
                "No qualifying investment opportunities found for the requested profile. \
                 Consider a broader price range or a different time horizon."
                    .to_string(),
            )
        } else {
            None
        };

        tracing::info!(
            "Advice ready: {} recommendations, {:.2} invested, confidence {:.2}",
            recommendations.len(),
            total_invested,
            confidence
        );

        AdviceResponse {
            recommendations,
            risk,
            total_invested,
            confidence,
            message,
            generated_at: Utc::now(),
        }
    }

    /// Fetch trending, undervalued and newly released cards for every
    /// requested game concurrently; dedup by id, apply the price filter,
    /// cap the candidate set. Source failures degrade to empty lists.
    async fn fetch_candidates(&self, request: &AdviceRequest) -> Vec<CardCandidate> {
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();

        for &game in &request.card_games {
            let (trending, undervalued, releases) = tokio::join!(
                self.market.get_trending_cards(game),
                self.market.get_undervalued_cards(game),
                self.market.get_new_releases(game),
            );

            for (source, result) in [
                ("trending", trending),
                ("undervalued", undervalued),
                ("new releases", releases),
            ] {
                match result {
                    Ok(cards) => candidates.extend(cards),
                    Err(e) => {
                        tracing::warn!(
                            "{} feed unavailable for {}: {}",
                            source,
                            game.as_str(),
                            e
                        );
                    }
                }
            }
        }

        candidates.retain(|card| {
            request.card_games.contains(&card.game)
                && request.price_range.contains(card.current_price)
                && seen.insert(card.id.clone())
        });
        candidates.truncate(MAX_CANDIDATES);
        candidates
    }

    fn notify_success(&self, user_id: &str, response: &AdviceResponse) {
        if let Some(notifier) = &self.notifier {
            notifier.send_alert(Alert::new(
                AlertType::AdviceGenerated {
                    user_id: user_id.to_string(),
                    recommendations: response.recommendations.len(),
                    total_invested: response.total_invested,
                    confidence: response.confidence,
                },
                "Investment advice ready",
                format!(
                    "{} recommendations, {:.2} allocated",
                    response.recommendations.len(),
                    response.total_invested
                ),
            ));
        }
    }

    fn notify_failure(&self, user_id: &str, reason: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.send_alert(Alert::new(
                AlertType::AdviceFailed {
                    user_id: user_id.to_string(),
                    reason: reason.to_string(),
                },
                "Advice request rejected",
                reason.to_string(),
            ));
        }
    }
}

#[cfg(test)]
mod tests;
