//! advisor-cli: Generate card investment advice from the command line.
//!
//! Usage:
//!   cargo run -p advisor-cli -- --user u123 --amount 1000
//!   cargo run -p advisor-cli -- --user u123 --amount 500 --risk AGGRESSIVE --horizon 180
//!   cargo run -p advisor-cli -- --user u123 --amount 250 --games pokemon,mtg --range budget
//!
//! Requires CARDMARKET_API_KEY. Optional: CARDMARKET_API_URL,
//! CARDMARKET_RATE_LIMIT, ADVISOR_WEBHOOK_URL.

use advice_orchestrator::AdviceOrchestrator;
use advisor_core::{
    AdviceRequest, AdvisorConfig, CardGame, PriceRange, RiskLevel, TimeHorizon,
};
use anyhow::{bail, Context};
use cardmarket_client::CardMarketClient;
use notification_service::{NotificationConfig, NotificationService};
use std::sync::Arc;

fn parse_games(value: &str) -> anyhow::Result<Vec<CardGame>> {
    value
        .split(',')
        .map(|g| match g.trim().to_ascii_lowercase().as_str() {
            "pokemon" => Ok(CardGame::Pokemon),
            "yugioh" => Ok(CardGame::Yugioh),
            "mtg" => Ok(CardGame::Mtg),
            "onepiece" => Ok(CardGame::OnePiece),
            other => bail!("Unknown card game: {other}"),
        })
        .collect()
}

fn parse_range(value: &str) -> anyhow::Result<PriceRange> {
    match value.to_ascii_lowercase().as_str() {
        "all" => Ok(PriceRange::All),
        "budget" => Ok(PriceRange::Budget),
        "midrange" => Ok(PriceRange::MidRange),
        "premium" => Ok(PriceRange::Premium),
        "luxury" => Ok(PriceRange::Luxury),
        other => {
            // "min:max" form, e.g. "10:50"
            let (min, max) = other
                .split_once(':')
                .with_context(|| format!("Unknown price range: {other}"))?;
            Ok(PriceRange::Custom {
                min: min.parse()?,
                max: max.parse()?,
            })
        }
    }
}

/// Value of a `--flag value` pair, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn build_request(args: &[String]) -> anyhow::Result<AdviceRequest> {
    let user_id = flag_value(args, "--user")
        .context("--user <id> is required")?
        .to_string();
    let amount: f64 = flag_value(args, "--amount")
        .context("--amount <value> is required")?
        .parse()
        .context("--amount must be a number")?;
    let risk_level = match flag_value(args, "--risk") {
        Some(v) => v.parse::<RiskLevel>().map_err(anyhow::Error::new)?,
        None => RiskLevel::Moderate,
    };
    let time_horizon = match flag_value(args, "--horizon") {
        Some(v) => TimeHorizon::from_days(v.parse().context("--horizon must be a number")?)
            .map_err(anyhow::Error::new)?,
        None => TimeHorizon::Days90,
    };
    let price_range = match flag_value(args, "--range") {
        Some(v) => parse_range(v)?,
        None => PriceRange::All,
    };
    let card_games = match flag_value(args, "--games") {
        Some(v) => parse_games(v)?,
        None => CardGame::ALL.to_vec(),
    };

    Ok(AdviceRequest {
        user_id,
        amount,
        risk_level,
        time_horizon,
        price_range,
        card_games,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "advisor_cli=info,advice_orchestrator=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request = build_request(&args)?;

    let api_key =
        std::env::var("CARDMARKET_API_KEY").context("CARDMARKET_API_KEY must be set")?;
    let client = Arc::new(CardMarketClient::new(api_key));

    let notifier = NotificationService::new(&NotificationConfig::from_env());
    let orchestrator =
        AdviceOrchestrator::new(client.clone(), client, AdvisorConfig::default())?
            .with_notifier(notifier);

    let response = orchestrator.generate_investment_advice(&request).await?;

    tracing::info!(
        "{} recommendations, {:.2} of {:.2} allocated",
        response.recommendations.len(),
        response.total_invested,
        request.amount
    );
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
