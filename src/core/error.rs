//! Error taxonomy shared by providers, the forecaster and the CLI.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to fetch price history for {symbol}/{currency}: {reason}")]
    Fetch {
        symbol: String,
        currency: String,
        reason: String,
    },

    #[error("Failed to fetch exchange rate {from}->{to}: {reason}")]
    RateFetch {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Insufficient data: {observations} observations, at least {required} required")]
    InsufficientData { observations: usize, required: usize },

    #[error("Unsupported cryptocurrency symbol: {0}")]
    UnsupportedSymbol(String),

    #[error("Prediction horizon must be at least 1 day")]
    InvalidHorizon,
}

impl CoreError {
    pub fn fetch(symbol: &str, currency: &str, reason: impl ToString) -> Self {
        CoreError::Fetch {
            symbol: symbol.to_string(),
            currency: currency.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn rate_fetch(from: &str, to: &str, reason: impl ToString) -> Self {
        CoreError::RateFetch {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        }
    }
}
