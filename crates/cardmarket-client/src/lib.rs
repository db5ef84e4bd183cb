use advisor_core::{
    AdviceError, CardCandidate, CardGame, Holding, MarketDataProvider, MarketSentiment,
    Portfolio, PortfolioProvider, PricePoint, TechnicalSnapshot, VolumeStats,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.cardmarketiq.io";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for market API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// HTTP client for the card-market data API. Implements both collaborator
/// boundaries the advice pipeline consumes.
#[derive(Clone)]
pub struct CardMarketClient {
    base_url: String,
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl CardMarketClient {
    pub fn new(api_key: String) -> Self {
        let base_url =
            std::env::var("CARDMARKET_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        // Per-minute budget; free-tier users should set CARDMARKET_RATE_LIMIT.
        let rate_limit: usize = std::env::var("CARDMARKET_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url,
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AdviceError> {
        let request = builder
            .header("x-api-key", &self.api_key)
            .build()
            .map_err(|e| AdviceError::MarketData(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AdviceError::MarketData("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AdviceError::MarketData(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64 * (attempt + 1) as u64;
            tracing::warn!(
                "Market API 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(AdviceError::MarketData(
            "Rate limited by market API after 3 retries".to_string(),
        ))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AdviceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.send_request(self.client.get(&url).query(query)).await?;

        if !response.status().is_success() {
            return Err(AdviceError::MarketData(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AdviceError::MarketData(e.to_string()))
    }

    async fn get_card_list(
        &self,
        path: &str,
        game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError> {
        let response: CardListResponse = self
            .get_json(path, &[("game", game.as_str().to_string())])
            .await?;
        Ok(response.cards.into_iter().map(CardDto::into_candidate).collect())
    }
}

#[async_trait]
impl MarketDataProvider for CardMarketClient {
    async fn get_trending_cards(
        &self,
        game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError> {
        self.get_card_list("/v1/cards/trending", game).await
    }

    async fn get_undervalued_cards(
        &self,
        game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError> {
        self.get_card_list("/v1/cards/undervalued", game).await
    }

    async fn get_new_releases(
        &self,
        game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError> {
        self.get_card_list("/v1/cards/new-releases", game).await
    }

    async fn get_price_history(
        &self,
        card_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, AdviceError> {
        let response: PriceHistoryResponse = self
            .get_json(
                &format!("/v1/cards/{card_id}/price-history"),
                &[("days", days.to_string())],
            )
            .await?;
        Ok(response
            .points
            .into_iter()
            .map(|p| PricePoint {
                date: p.date,
                price: p.price,
            })
            .collect())
    }

    async fn get_card_volume(&self, card_id: &str) -> Result<VolumeStats, AdviceError> {
        let dto: VolumeDto = self
            .get_json(&format!("/v1/cards/{card_id}/volume"), &[])
            .await?;
        Ok(VolumeStats {
            average: dto.average,
            trend: dto.trend.unwrap_or(0.0),
        })
    }

    async fn get_market_sentiment(
        &self,
        card_id: &str,
    ) -> Result<MarketSentiment, AdviceError> {
        let dto: SentimentDto = self
            .get_json(&format!("/v1/cards/{card_id}/sentiment"), &[])
            .await?;
        Ok(MarketSentiment {
            sentiment: dto.sentiment.clamp(-1.0, 1.0),
            sources: dto.sources.unwrap_or(0),
        })
    }

    async fn get_technical_indicators(
        &self,
        card_id: &str,
    ) -> Result<TechnicalSnapshot, AdviceError> {
        let dto: IndicatorsDto = self
            .get_json(&format!("/v1/cards/{card_id}/indicators"), &[])
            .await?;
        Ok(TechnicalSnapshot {
            rsi: dto.rsi,
            macd: dto.macd,
            ma50: dto.ma50,
            price: dto.price,
        })
    }
}

#[async_trait]
impl PortfolioProvider for CardMarketClient {
    async fn get_user_portfolio(&self, user_id: &str) -> Result<Portfolio, AdviceError> {
        let dto: PortfolioDto = self
            .get_json(&format!("/v1/portfolios/{user_id}"), &[])
            .await
            .map_err(|e| AdviceError::PortfolioData(e.to_string()))?;

        Ok(Portfolio {
            total_value: dto.total_value,
            diversification: dto.diversification.unwrap_or(0.5).clamp(0.0, 1.0),
            risk_level: dto.risk_level.unwrap_or(0.5).clamp(0.0, 1.0),
            performance: dto.performance.unwrap_or(0.0),
            holdings: dto
                .holdings
                .into_iter()
                .map(|h| Holding {
                    card_id: h.card_id,
                    name: h.name.unwrap_or_default(),
                    quantity: h.quantity,
                    purchase_price: h.purchase_price,
                    current_value: h.current_value,
                })
                .collect(),
        })
    }
}

// --- Wire DTOs ---

#[derive(Debug, Deserialize)]
struct CardListResponse {
    #[serde(default)]
    cards: Vec<CardDto>,
}

#[derive(Debug, Deserialize)]
struct CardDto {
    id: String,
    name: String,
    game: CardGame,
    current_price: f64,
    #[serde(default)]
    rarity: Option<String>,
    #[serde(default)]
    edition: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    release_date: Option<NaiveDate>,
}

impl CardDto {
    fn into_candidate(self) -> CardCandidate {
        CardCandidate {
            id: self.id,
            name: self.name,
            game: self.game,
            current_price: self.current_price,
            rarity: self.rarity,
            edition: self.edition,
            condition: self.condition,
            release_date: self.release_date,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceHistoryResponse {
    #[serde(default)]
    points: Vec<PricePointDto>,
}

#[derive(Debug, Deserialize)]
struct PricePointDto {
    date: DateTime<Utc>,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct VolumeDto {
    average: f64,
    #[serde(default)]
    trend: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SentimentDto {
    sentiment: f64,
    #[serde(default)]
    sources: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct IndicatorsDto {
    rsi: f64,
    macd: f64,
    ma50: f64,
    price: f64,
}

#[derive(Debug, Deserialize)]
struct PortfolioDto {
    total_value: f64,
    #[serde(default)]
    diversification: Option<f64>,
    #[serde(default)]
    risk_level: Option<f64>,
    #[serde(default)]
    performance: Option<f64>,
    #[serde(default)]
    holdings: Vec<HoldingDto>,
}

#[derive(Debug, Deserialize)]
struct HoldingDto {
    card_id: String,
    #[serde(default)]
    name: Option<String>,
    quantity: u32,
    purchase_price: f64,
    current_value: f64,
}
