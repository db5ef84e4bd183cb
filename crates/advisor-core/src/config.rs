use crate::{AdviceError, CardGame};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Inclusive bounds on the investment amount accepted by the pipeline.
pub const MIN_INVESTMENT: f64 = 10.0;
pub const MAX_INVESTMENT: f64 = 100_000.0;

/// Investor risk profile. Each level carries a risk-tolerance ceiling and
/// an allocation tilt factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskLevel {
    /// Maximum acceptable overall risk for this profile.
    pub fn max_risk(&self) -> f64 {
        match self {
            RiskLevel::Conservative => 0.25,
            RiskLevel::Moderate => 0.40,
            RiskLevel::Aggressive => 0.60,
        }
    }

    /// Per-rank allocation tilt. Conservative allocations are flat.
    pub fn allocation_tilt(&self) -> f64 {
        match self {
            RiskLevel::Conservative => 0.0,
            RiskLevel::Moderate => 0.1,
            RiskLevel::Aggressive => 0.2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Conservative => "CONSERVATIVE",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::Aggressive => "AGGRESSIVE",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = AdviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CONSERVATIVE" => Ok(RiskLevel::Conservative),
            "MODERATE" => Ok(RiskLevel::Moderate),
            "AGGRESSIVE" => Ok(RiskLevel::Aggressive),
            other => Err(AdviceError::Validation(format!(
                "Unknown risk level: {other}"
            ))),
        }
    }
}

/// Investment time horizon. Only the four listed periods are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeHorizon {
    Days30,
    Days90,
    Days180,
    Days365,
}

impl TimeHorizon {
    pub fn days(&self) -> u32 {
        match self {
            TimeHorizon::Days30 => 30,
            TimeHorizon::Days90 => 90,
            TimeHorizon::Days180 => 180,
            TimeHorizon::Days365 => 365,
        }
    }

    pub fn from_days(days: u32) -> Result<Self, AdviceError> {
        match days {
            30 => Ok(TimeHorizon::Days30),
            90 => Ok(TimeHorizon::Days90),
            180 => Ok(TimeHorizon::Days180),
            365 => Ok(TimeHorizon::Days365),
            other => Err(AdviceError::Validation(format!(
                "Unsupported time horizon: {other} days"
            ))),
        }
    }
}

/// Price band filter applied to candidate cards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceRange {
    All,
    Budget,
    MidRange,
    Premium,
    Luxury,
    Custom { min: f64, max: f64 },
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        match self {
            PriceRange::All => true,
            PriceRange::Budget => price < 25.0,
            PriceRange::MidRange => (25.0..100.0).contains(&price),
            PriceRange::Premium => (100.0..500.0).contains(&price),
            PriceRange::Luxury => price >= 500.0,
            PriceRange::Custom { min, max } => price >= *min && price <= *max,
        }
    }
}

/// A validated advice request. Validation happens once at orchestration
/// entry; this is the only step that can abort the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceRequest {
    pub user_id: String,
    pub amount: f64,
    pub risk_level: RiskLevel,
    pub time_horizon: TimeHorizon,
    pub price_range: PriceRange,
    pub card_games: Vec<CardGame>,
}

impl AdviceRequest {
    pub fn validate(&self) -> Result<(), AdviceError> {
        if !self.amount.is_finite() {
            return Err(AdviceError::Validation(
                "Investment amount must be a finite number".to_string(),
            ));
        }
        if self.amount < MIN_INVESTMENT || self.amount > MAX_INVESTMENT {
            return Err(AdviceError::Validation(format!(
                "Investment amount {} outside [{}, {}]",
                self.amount, MIN_INVESTMENT, MAX_INVESTMENT
            )));
        }
        if self.card_games.is_empty() {
            return Err(AdviceError::Validation(
                "At least one card game must be selected".to_string(),
            ));
        }
        if let PriceRange::Custom { min, max } = self.price_range {
            if min < 0.0 || max < min {
                return Err(AdviceError::Validation(format!(
                    "Invalid custom price range [{min}, {max}]"
                )));
            }
        }
        Ok(())
    }

    /// Stable fingerprint of the request parameters, used as the cache key.
    pub fn fingerprint(&self) -> String {
        let mut games: Vec<&str> = self.card_games.iter().map(|g| g.as_str()).collect();
        games.sort_unstable();
        let range = match self.price_range {
            PriceRange::Custom { min, max } => format!("custom:{min}:{max}"),
            other => format!("{other:?}").to_ascii_lowercase(),
        };
        format!(
            "{}:{:.2}:{}:{}:{}:{}",
            self.user_id,
            self.amount,
            self.risk_level.as_str(),
            self.time_horizon.days(),
            range,
            games.join(",")
        )
    }
}

/// Fixed weights combining the five signal scores. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalWeights {
    pub price_trend: f64,
    pub volume: f64,
    pub sentiment: f64,
    pub technical: f64,
    pub fundamental: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            price_trend: 0.25,
            volume: 0.20,
            sentiment: 0.15,
            technical: 0.20,
            fundamental: 0.20,
        }
    }
}

impl SignalWeights {
    pub fn sum(&self) -> f64 {
        self.price_trend + self.volume + self.sentiment + self.technical + self.fundamental
    }

    pub fn validate(&self) -> Result<(), AdviceError> {
        if (self.sum() - 1.0).abs() > 1e-9 {
            return Err(AdviceError::Config(format!(
                "Signal weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// Fixed weights combining the five portfolio risk sub-scores. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskWeights {
    pub market: f64,
    pub liquidity: f64,
    pub concentration: f64,
    pub volatility: f64,
    pub regulatory: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            market: 0.25,
            liquidity: 0.20,
            concentration: 0.15,
            volatility: 0.30,
            regulatory: 0.10,
        }
    }
}

impl RiskWeights {
    pub fn sum(&self) -> f64 {
        self.market + self.liquidity + self.concentration + self.volatility + self.regulatory
    }

    pub fn validate(&self) -> Result<(), AdviceError> {
        if (self.sum() - 1.0).abs() > 1e-9 {
            return Err(AdviceError::Config(format!(
                "Risk weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// Pipeline tunables. All values are configuration defaults carried over
/// from the original behavior, not derived business rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    pub signal_weights: SignalWeights,
    pub risk_weights: RiskWeights,
    /// Candidates scoring at or below this are discarded before allocation.
    pub score_cutoff: f64,
    /// Minimum score for an opportunity to become a recommendation.
    pub recommendation_threshold: f64,
    /// Per-factor score above which a canned reasoning sentence is emitted.
    pub reasoning_threshold: f64,
    /// Practical cap on concurrent positions per advice request.
    pub max_positions: usize,
    /// Historical lookback for per-signal analysis, in days.
    pub lookback_days: u32,
    /// Daily-sales volume treated as a fully liquid market.
    pub reference_volume: f64,
    /// TTL for cached advice responses, in seconds.
    pub cache_ttl_secs: i64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            signal_weights: SignalWeights::default(),
            risk_weights: RiskWeights::default(),
            score_cutoff: 0.6,
            recommendation_threshold: 0.7,
            reasoning_threshold: 0.7,
            max_positions: 5,
            lookback_days: 30,
            reference_volume: 100.0,
            cache_ttl_secs: 300,
        }
    }
}

impl AdvisorConfig {
    pub fn validate(&self) -> Result<(), AdviceError> {
        self.signal_weights.validate()?;
        self.risk_weights.validate()?;
        for (name, value) in [
            ("score_cutoff", self.score_cutoff),
            ("recommendation_threshold", self.recommendation_threshold),
            ("reasoning_threshold", self.reasoning_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AdviceError::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.max_positions == 0 {
            return Err(AdviceError::Config(
                "max_positions must be at least 1".to_string(),
            ));
        }
        if self.reference_volume <= 0.0 {
            return Err(AdviceError::Config(
                "reference_volume must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
