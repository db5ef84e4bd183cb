use advisor_core::{CardCandidate, MarketDataProvider, SignalAnalyzer, SignalKind, SignalResult};
use async_trait::async_trait;
use serde_json::json;

/// Sentiment analyzer: remaps the collaborator's [-1, 1] sentiment score
/// linearly into [0, 1].
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalAnalyzer for SentimentAnalyzer {
    fn kind(&self) -> SignalKind {
        SignalKind::Sentiment
    }

    async fn analyze(
        &self,
        market: &dyn MarketDataProvider,
        card: &CardCandidate,
        _lookback_days: u32,
    ) -> SignalResult {
        let sentiment = match market.get_market_sentiment(&card.id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Sentiment unavailable for {}: {}", card.id, e);
                return SignalResult::neutral("sentiment unavailable");
            }
        };

        let score = (sentiment.sentiment + 1.0) / 2.0;

        SignalResult::new(
            score,
            json!({
                "raw_sentiment": sentiment.sentiment,
                "sources": sentiment.sources,
            }),
        )
    }
}
