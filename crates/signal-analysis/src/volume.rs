use advisor_core::{CardCandidate, MarketDataProvider, SignalAnalyzer, SignalKind, SignalResult};
use async_trait::async_trait;
use serde_json::json;

/// Volume analyzer: scores average daily sales against a reference volume
/// treated as a fully liquid market.
pub struct VolumeAnalyzer {
    reference_volume: f64,
}

impl VolumeAnalyzer {
    pub fn new(reference_volume: f64) -> Self {
        Self { reference_volume }
    }
}

#[async_trait]
impl SignalAnalyzer for VolumeAnalyzer {
    fn kind(&self) -> SignalKind {
        SignalKind::Volume
    }

    async fn analyze(
        &self,
        market: &dyn MarketDataProvider,
        card: &CardCandidate,
        _lookback_days: u32,
    ) -> SignalResult {
        let stats = match market.get_card_volume(&card.id).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!("Volume data unavailable for {}: {}", card.id, e);
                return SignalResult::neutral("volume data unavailable");
            }
        };

        let score = if self.reference_volume > 0.0 {
            (stats.average / self.reference_volume).min(1.0).max(0.0)
        } else {
            0.5
        };

        SignalResult::new(
            score,
            json!({
                "average": stats.average,
                "trend": stats.trend,
                "reference": self.reference_volume,
            }),
        )
    }
}
