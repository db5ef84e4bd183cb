use advisor_core::{CardCandidate, MarketDataProvider, SignalAnalyzer, SignalKind, SignalResult};
use async_trait::async_trait;
use serde_json::json;
use statrs::statistics::Statistics;

/// Price-trend analyzer: fits a least-squares line to the historical price
/// series and scores the normalized slope.
pub struct PriceTrendAnalyzer;

impl PriceTrendAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Least-squares slope of `prices` against their index (price per day).
    fn linear_slope(prices: &[f64]) -> f64 {
        let n = prices.len() as f64;
        if prices.len() < 2 {
            return 0.0;
        }
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = prices.iter().sum::<f64>() / n;
        let mut num = 0.0;
        let mut den = 0.0;
        for (i, &price) in prices.iter().enumerate() {
            let dx = i as f64 - mean_x;
            num += dx * (price - mean_y);
            den += dx * dx;
        }
        if den == 0.0 {
            0.0
        } else {
            num / den
        }
    }

    /// Std-dev of daily returns; fed into opportunity risk as the
    /// price-trend factor's own volatility contribution.
    fn return_volatility(prices: &[f64]) -> f64 {
        if prices.len() < 3 {
            return 0.0;
        }
        let returns: Vec<f64> = prices
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        if returns.len() < 2 {
            return 0.0;
        }
        returns.std_dev()
    }
}

impl Default for PriceTrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalAnalyzer for PriceTrendAnalyzer {
    fn kind(&self) -> SignalKind {
        SignalKind::PriceTrend
    }

    async fn analyze(
        &self,
        market: &dyn MarketDataProvider,
        card: &CardCandidate,
        lookback_days: u32,
    ) -> SignalResult {
        let history = match market.get_price_history(&card.id, lookback_days).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!("Price history unavailable for {}: {}", card.id, e);
                return SignalResult::neutral("price history unavailable");
            }
        };

        if history.len() < 2 {
            return SignalResult::neutral("insufficient price history");
        }

        let prices: Vec<f64> = history.iter().map(|p| p.price).collect();
        let mean_price = prices.iter().sum::<f64>() / prices.len() as f64;
        let slope = Self::linear_slope(&prices);

        // Normalize the per-day slope to a relative change over the window,
        // so a card going from 100 to 130 in 30 days scores ~0.30.
        let normalized_slope = if mean_price > 0.0 {
            slope * (prices.len() as f64 - 1.0) / mean_price
        } else {
            0.0
        };
        let score = normalized_slope.clamp(0.0, 1.0);
        let volatility = Self::return_volatility(&prices);

        SignalResult::new(
            score,
            json!({
                "slope_per_day": slope,
                "normalized_slope": normalized_slope,
                "volatility": volatility,
                "samples": prices.len(),
                "mean_price": mean_price,
            }),
        )
    }
}
