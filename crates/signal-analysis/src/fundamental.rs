use advisor_core::{CardCandidate, MarketDataProvider, SignalAnalyzer, SignalKind, SignalResult};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::json;

/// Score contributed by a card attribute the candidate snapshot doesn't carry.
const NEUTRAL_COMPONENT: f64 = 0.5;

/// Fundamental analyzer: lookup-table scores over rarity, edition, condition
/// and age, averaged. Pure — works entirely off the candidate snapshot.
pub struct FundamentalAnalyzer;

impl FundamentalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn rarity_score(rarity: &str) -> f64 {
        match rarity.to_ascii_lowercase().as_str() {
            "common" => 0.1,
            "uncommon" => 0.2,
            "rare" => 0.4,
            "holo rare" | "holofoil" => 0.55,
            "ultra rare" => 0.7,
            "secret rare" => 0.85,
            "special illustration rare" | "alternate art" => 0.95,
            "promo" => 0.6,
            _ => NEUTRAL_COMPONENT,
        }
    }

    fn edition_score(edition: &str) -> f64 {
        match edition.to_ascii_lowercase().as_str() {
            "1st edition" | "first edition" => 1.0,
            "shadowless" => 0.9,
            "limited" => 0.8,
            "unlimited" => 0.4,
            "reprint" => 0.2,
            _ => NEUTRAL_COMPONENT,
        }
    }

    fn condition_score(condition: &str) -> f64 {
        match condition.to_ascii_lowercase().as_str() {
            "gem mint" | "psa 10" => 1.0,
            "mint" | "psa 9" => 0.9,
            "near mint" | "nm" => 0.75,
            "excellent" | "ex" => 0.6,
            "good" => 0.4,
            "played" | "poor" => 0.15,
            _ => NEUTRAL_COMPONENT,
        }
    }

    /// Older cards are scarcer. Saturates at 20 years.
    fn age_score(release_year: i32, current_year: i32) -> f64 {
        let age_years = (current_year - release_year).max(0) as f64;
        (age_years / 20.0).min(1.0)
    }
}

impl Default for FundamentalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalAnalyzer for FundamentalAnalyzer {
    fn kind(&self) -> SignalKind {
        SignalKind::Fundamental
    }

    async fn analyze(
        &self,
        _market: &dyn MarketDataProvider,
        card: &CardCandidate,
        _lookback_days: u32,
    ) -> SignalResult {
        let rarity = card
            .rarity
            .as_deref()
            .map(Self::rarity_score)
            .unwrap_or(NEUTRAL_COMPONENT);
        let edition = card
            .edition
            .as_deref()
            .map(Self::edition_score)
            .unwrap_or(NEUTRAL_COMPONENT);
        let condition = card
            .condition
            .as_deref()
            .map(Self::condition_score)
            .unwrap_or(NEUTRAL_COMPONENT);
        let age = card
            .release_date
            .map(|d| Self::age_score(d.year(), Utc::now().year()))
            .unwrap_or(NEUTRAL_COMPONENT);

        let score = (rarity + edition + condition + age) / 4.0;

        SignalResult::new(
            score,
            json!({
                "rarity_score": rarity,
                "edition_score": edition,
                "condition_score": condition,
                "age_score": age,
            }),
        )
    }
}
