//! Error taxonomy for rate resolution

use thiserror::Error;

/// Failures raised while resolving a rate or converting an amount.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    /// Amount missing, non-numeric, negative or not finite
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code absent from the rate table in use
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Rate table entry for the currency is zero
    #[error("Division by zero: rate for {0} is zero")]
    DivisionByZero(String),

    /// Backend unreachable, timed out, non-2xx or unreadable response
    #[error("Network failure: {0}")]
    NetworkFailure(String),
}

impl RateError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkFailure(msg.into())
    }

    /// Whether the next resolution tier may absorb this failure.
    ///
    /// `InvalidAmount` concerns the user's input and would fail against any
    /// table, so it is surfaced directly.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RateError::InvalidAmount(_))
    }
}

impl From<reqwest::Error> for RateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RateError::NetworkFailure(format!("Request timed out: {err}"))
        } else {
            RateError::NetworkFailure(err.to_string())
        }
    }
}
