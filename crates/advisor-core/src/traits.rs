use crate::{
    AdviceError, CardCandidate, CardGame, MarketSentiment, Portfolio, PricePoint, SignalKind,
    SignalResult, TechnicalSnapshot, VolumeStats,
};
use async_trait::async_trait;

/// Market-data collaborator boundary. Implementations own the transport;
/// the pipeline only sees typed results.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_trending_cards(&self, game: CardGame)
        -> Result<Vec<CardCandidate>, AdviceError>;

    async fn get_undervalued_cards(
        &self,
        game: CardGame,
    ) -> Result<Vec<CardCandidate>, AdviceError>;

    async fn get_new_releases(&self, game: CardGame)
        -> Result<Vec<CardCandidate>, AdviceError>;

    async fn get_price_history(
        &self,
        card_id: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, AdviceError>;

    async fn get_card_volume(&self, card_id: &str) -> Result<VolumeStats, AdviceError>;

    async fn get_market_sentiment(&self, card_id: &str)
        -> Result<MarketSentiment, AdviceError>;

    async fn get_technical_indicators(
        &self,
        card_id: &str,
    ) -> Result<TechnicalSnapshot, AdviceError>;
}

/// Portfolio collaborator boundary.
#[async_trait]
pub trait PortfolioProvider: Send + Sync {
    async fn get_user_portfolio(&self, user_id: &str) -> Result<Portfolio, AdviceError>;
}

/// One independent market-signal analyzer.
///
/// Analyzers never propagate collaborator failures: on any fetch error they
/// return the neutral default so aggregate scoring degrades instead of
/// failing the whole request.
#[async_trait]
pub trait SignalAnalyzer: Send + Sync {
    fn kind(&self) -> SignalKind;

    async fn analyze(
        &self,
        market: &dyn MarketDataProvider,
        card: &CardCandidate,
        lookback_days: u32,
    ) -> SignalResult;
}
