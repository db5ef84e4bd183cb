use advisor_core::{
    CardCandidate, MarketDataProvider, SignalAnalyzer, SignalKind, SignalResult,
    TechnicalSnapshot,
};
use async_trait::async_trait;
use serde_json::json;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;

/// Technical analyzer: composite of an RSI band score, MACD sign, and a
/// price-vs-moving-average comparison, averaged.
pub struct TechnicalAnalyzer;

impl TechnicalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Oversold is bullish for an entry signal, overbought bearish, linear
    /// in between.
    fn rsi_score(rsi: f64) -> f64 {
        if rsi <= RSI_OVERSOLD {
            1.0
        } else if rsi >= RSI_OVERBOUGHT {
            0.0
        } else {
            (RSI_OVERBOUGHT - rsi) / (RSI_OVERBOUGHT - RSI_OVERSOLD)
        }
    }

    fn composite(snapshot: &TechnicalSnapshot) -> (f64, f64, f64) {
        let rsi = Self::rsi_score(snapshot.rsi);
        let macd = if snapshot.macd > 0.0 { 1.0 } else { 0.0 };
        let ma = if snapshot.price > snapshot.ma50 { 1.0 } else { 0.0 };
        (rsi, macd, ma)
    }
}

impl Default for TechnicalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalAnalyzer for TechnicalAnalyzer {
    fn kind(&self) -> SignalKind {
        SignalKind::Technical
    }

    async fn analyze(
        &self,
        market: &dyn MarketDataProvider,
        card: &CardCandidate,
        _lookback_days: u32,
    ) -> SignalResult {
        let snapshot = match market.get_technical_indicators(&card.id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Technical indicators unavailable for {}: {}", card.id, e);
                return SignalResult::neutral("technical indicators unavailable");
            }
        };

        let (rsi_score, macd_score, ma_score) = Self::composite(&snapshot);
        let score = (rsi_score + macd_score + ma_score) / 3.0;

        SignalResult::new(
            score,
            json!({
                "rsi": snapshot.rsi,
                "rsi_score": rsi_score,
                "macd": snapshot.macd,
                "macd_score": macd_score,
                "ma50": snapshot.ma50,
                "price": snapshot.price,
                "ma_score": ma_score,
            }),
        )
    }
}
