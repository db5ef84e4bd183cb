pub mod fundamental;
pub mod sentiment;
pub mod technical;
pub mod trend;
pub mod volume;

pub use fundamental::FundamentalAnalyzer;
pub use sentiment::SentimentAnalyzer;
pub use technical::TechnicalAnalyzer;
pub use trend::PriceTrendAnalyzer;
pub use volume::VolumeAnalyzer;

use advisor_core::{
    CardCandidate, MarketDataProvider, SignalAnalyzer, SignalKind, SignalResult,
};
use std::collections::BTreeMap;

/// Bundle of the five signal analyzers for one advice pipeline.
pub struct SignalEngines {
    trend: PriceTrendAnalyzer,
    volume: VolumeAnalyzer,
    sentiment: SentimentAnalyzer,
    technical: TechnicalAnalyzer,
    fundamental: FundamentalAnalyzer,
}

impl SignalEngines {
    pub fn new(reference_volume: f64) -> Self {
        Self {
            trend: PriceTrendAnalyzer::new(),
            volume: VolumeAnalyzer::new(reference_volume),
            sentiment: SentimentAnalyzer::new(),
            technical: TechnicalAnalyzer::new(),
            fundamental: FundamentalAnalyzer::new(),
        }
    }

    /// Run all five analyzers for one card concurrently and join.
    /// Individual analyzers degrade to neutral on collaborator failure, so
    /// this always yields a full factor map.
    pub async fn analyze_all(
        &self,
        market: &dyn MarketDataProvider,
        card: &CardCandidate,
        lookback_days: u32,
    ) -> BTreeMap<SignalKind, SignalResult> {
        let (trend, volume, sentiment, technical, fundamental) = tokio::join!(
            self.trend.analyze(market, card, lookback_days),
            self.volume.analyze(market, card, lookback_days),
            self.sentiment.analyze(market, card, lookback_days),
            self.technical.analyze(market, card, lookback_days),
            self.fundamental.analyze(market, card, lookback_days),
        );

        let mut factors = BTreeMap::new();
        factors.insert(SignalKind::PriceTrend, trend);
        factors.insert(SignalKind::Volume, volume);
        factors.insert(SignalKind::Sentiment, sentiment);
        factors.insert(SignalKind::Technical, technical);
        factors.insert(SignalKind::Fundamental, fundamental);
        factors
    }
}
