use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Market data unavailable: {0}")]
    MarketData(String),

    #[error("Portfolio data unavailable: {0}")]
    PortfolioData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
