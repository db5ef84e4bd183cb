use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supported card games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardGame {
    Pokemon,
    Yugioh,
    Mtg,
    OnePiece,
}

impl CardGame {
    pub const ALL: [CardGame; 4] = [
        CardGame::Pokemon,
        CardGame::Yugioh,
        CardGame::Mtg,
        CardGame::OnePiece,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardGame::Pokemon => "pokemon",
            CardGame::Yugioh => "yugioh",
            CardGame::Mtg => "mtg",
            CardGame::OnePiece => "onepiece",
        }
    }
}

/// A candidate card as provided by the market-data collaborator.
/// Immutable snapshot; never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCandidate {
    pub id: String,
    pub name: String,
    pub game: CardGame,
    pub current_price: f64,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

/// One point of a card's price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: f64,
}

/// Trading volume summary for a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeStats {
    /// Average daily sales over the lookback window.
    pub average: f64,
    /// Relative change of recent volume vs the window average.
    pub trend: f64,
}

/// Aggregated market sentiment for a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSentiment {
    /// Sentiment in [-1, 1].
    pub sentiment: f64,
    /// Number of sources contributing to the score.
    pub sources: u32,
}

/// Point-in-time technical indicators for a card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub ma50: f64,
    pub price: f64,
}

/// The five independent market signals feeding the opportunity score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    PriceTrend,
    Volume,
    Sentiment,
    Technical,
    Fundamental,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::PriceTrend => "price_trend",
            SignalKind::Volume => "volume",
            SignalKind::Sentiment => "sentiment",
            SignalKind::Technical => "technical",
            SignalKind::Fundamental => "fundamental",
        }
    }
}

/// Result from a single signal analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalResult {
    /// Normalized score, always clamped to [0, 1].
    pub score: f64,
    /// True when the analyzer fell back to the neutral default because
    /// its collaborator data was unavailable.
    pub degraded: bool,
    /// Signal-specific auxiliary metrics.
    pub metrics: serde_json::Value,
}

impl SignalResult {
    pub fn new(score: f64, metrics: serde_json::Value) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            degraded: false,
            metrics,
        }
    }

    /// Neutral fallback used when collaborator data is unavailable.
    /// Partial unavailability lowers confidence, it never aborts analysis.
    pub fn neutral(reason: &str) -> Self {
        Self {
            score: 0.5,
            degraded: true,
            metrics: serde_json::json!({ "fallback": reason }),
        }
    }
}

/// A scored candidate: attractiveness plus risk, derived once and immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityAnalysis {
    pub card: CardCandidate,
    pub score: f64,
    pub factors: BTreeMap<SignalKind, SignalResult>,
    pub risk: f64,
    pub potential_return: f64,
    pub time_to_maturity_days: u32,
}

impl OpportunityAnalysis {
    /// Fraction of factors that fell back to the neutral default.
    pub fn degraded_fraction(&self) -> f64 {
        if self.factors.is_empty() {
            return 0.0;
        }
        let degraded = self.factors.values().filter(|f| f.degraded).count();
        degraded as f64 / self.factors.len() as f64
    }
}

/// Recommended action, derived solely from the opportunity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Wait,
    Hold,
    Buy,
    StrongBuy,
}

impl Action {
    /// Monotone mapping: a higher score never yields a weaker action.
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Action::StrongBuy
        } else if score > 0.7 {
            Action::Buy
        } else if score > 0.6 {
            Action::Hold
        } else {
            Action::Wait
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Action::Wait => 0,
            Action::Hold => 1,
            Action::Buy => 2,
            Action::StrongBuy => 3,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Action::Wait => "Wait",
            Action::Hold => "Hold",
            Action::Buy => "Buy",
            Action::StrongBuy => "Strong Buy",
        }
    }
}

/// A user-facing recommendation for one card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub card: CardCandidate,
    pub recommended_amount: f64,
    pub confidence: f64,
    pub risk: f64,
    pub potential_return: f64,
    pub time_to_maturity_days: u32,
    pub reasoning: Vec<String>,
    pub action: Action,
}

/// Risk sub-score categories for the portfolio assessment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Market,
    Liquidity,
    Concentration,
    Volatility,
    Regulatory,
}

/// Overall risk assessment of a recommendation set against a tolerance ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: f64,
    pub max_risk: f64,
    pub risk_tolerance: f64,
    pub is_within_tolerance: bool,
    pub risk_breakdown: BTreeMap<RiskCategory, f64>,
    pub risk_mitigation: Vec<String>,
}

/// One card position in the user's portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub card_id: String,
    pub name: String,
    pub quantity: u32,
    pub purchase_price: f64,
    pub current_value: f64,
}

/// User portfolio snapshot, read-only in this pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub total_value: f64,
    /// Diversification in [0, 1]; 1 = perfectly spread.
    pub diversification: f64,
    /// Aggregate risk level of current holdings, [0, 1].
    pub risk_level: f64,
    /// Overall return since inception (fraction).
    pub performance: f64,
    pub holdings: Vec<Holding>,
}

impl Default for Portfolio {
    /// Degraded fallback when the portfolio collaborator is unavailable.
    fn default() -> Self {
        Self {
            total_value: 0.0,
            diversification: 0.5,
            risk_level: 0.5,
            performance: 0.0,
            holdings: Vec::new(),
        }
    }
}

/// Final advice response. Always well-formed for valid inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceResponse {
    pub recommendations: Vec<Recommendation>,
    pub risk: RiskAssessment,
    pub total_invested: f64,
    pub confidence: f64,
    /// Set when no qualifying opportunities were found.
    #[serde(default)]
    pub message: Option<String>,
    pub generated_at: DateTime<Utc>,
}
