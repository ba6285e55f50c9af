//! Rate tables, conversion types and the rate arithmetic

use crate::core::error::RateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Currency every rate table in this crate is anchored at.
pub const BASE_CURRENCY: &str = "USD";

/// Provenance of the rate used for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Fetched from the live backend for this request
    Realtime,
    /// Last-known-good snapshot of an earlier live fetch
    Stored,
    /// Static embedded table
    Fallback,
}

impl Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataSource::Realtime => "realtime",
                DataSource::Stored => "stored",
                DataSource::Fallback => "fallback",
            }
        )
    }
}

impl FromStr for DataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "realtime" => Ok(DataSource::Realtime),
            // The backend labels its database copy "cached"
            "stored" | "cached" => Ok(DataSource::Stored),
            "fallback" => Ok(DataSource::Fallback),
            _ => Err(anyhow::anyhow!("Invalid data source: {}", s)),
        }
    }
}

/// Units of each currency per one unit of the base currency.
///
/// Tables are immutable once built; a newer table replaces an older one
/// wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    base: String,
    rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Builds a table anchored at `base`. Codes are upper-cased, the base maps
    /// to 1.0, and negative or non-finite entries are dropped.
    pub fn new<I, S>(base: &str, rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let base = normalize_code(base);
        let mut table = BTreeMap::new();
        for (code, rate) in rates {
            let code = normalize_code(code.as_ref());
            if !rate.is_finite() || rate < 0.0 {
                warn!(currency = %code, rate, "Dropping unusable rate entry");
                continue;
            }
            table.insert(code, rate);
        }
        table.insert(base.clone(), 1.0);
        Self { base, rates: table }
    }

    /// Builds a USD-anchored table.
    pub fn usd<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self::new(BASE_CURRENCY, rates)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Returns a new table with `overrides` layered over this one.
    pub fn merged_with<I, S>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut rates: Vec<(String, f64)> = self
            .rates
            .iter()
            .map(|(code, rate)| (code.clone(), *rate))
            .collect();
        rates.extend(
            overrides
                .into_iter()
                .map(|(code, rate)| (code.as_ref().to_string(), rate)),
        );
        Self::new(&self.base, rates)
    }

    fn rate_of(&self, code: &str) -> Result<f64, RateError> {
        self.get(code)
            .ok_or_else(|| RateError::UnknownCurrency(code.to_string()))
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: f64,
}

impl ConversionRequest {
    pub fn new(from: &str, to: &str, amount: f64) -> Self {
        Self {
            from_currency: normalize_code(from),
            to_currency: normalize_code(to),
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), RateError> {
        if !self.amount.is_finite() {
            return Err(RateError::invalid_amount(format!(
                "{} is not a finite number",
                self.amount
            )));
        }
        if self.amount < 0.0 {
            return Err(RateError::invalid_amount(format!(
                "{} is negative",
                self.amount
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: f64,
    pub rate: f64,
    pub converted_amount: f64,
    pub timestamp: DateTime<Utc>,
    pub data_source: DataSource,
}

/// Parses an amount typed by a user, e.g. `"1,250.50"`.
pub fn parse_amount(input: &str) -> Result<f64, RateError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return Err(RateError::invalid_amount("amount is missing"));
    }
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| RateError::invalid_amount(format!("'{}' is not a number", input.trim())))?;
    ConversionRequest::new(BASE_CURRENCY, BASE_CURRENCY, amount).validate()?;
    Ok(amount)
}

/// Resolves the rate from `from` to `to`, chaining through the table's base
/// currency for cross pairs. The result is always finite and positive.
pub fn resolve_rate(table: &RateTable, from: &str, to: &str) -> Result<f64, RateError> {
    if from == to {
        return Ok(1.0);
    }
    let rate = pair_rate(table, from, to)?;
    // Near-zero entries overflow the division or underflow to zero
    if !rate.is_finite() || rate == 0.0 {
        return Err(RateError::DivisionByZero(format!("{from}/{to}")));
    }
    Ok(rate)
}

fn pair_rate(table: &RateTable, from: &str, to: &str) -> Result<f64, RateError> {

    let base = table.base();
    if from == base {
        let to_rate = table.rate_of(to)?;
        // A zero target would make the inverse pair divide by zero
        if to_rate == 0.0 {
            return Err(RateError::DivisionByZero(to.to_string()));
        }
        return Ok(to_rate);
    }

    let from_rate = table.rate_of(from)?;
    if to == base {
        if from_rate == 0.0 {
            return Err(RateError::DivisionByZero(from.to_string()));
        }
        return Ok(1.0 / from_rate);
    }

    let to_rate = table.rate_of(to)?;
    if from_rate == 0.0 {
        return Err(RateError::DivisionByZero(from.to_string()));
    }
    if to_rate == 0.0 {
        return Err(RateError::DivisionByZero(to.to_string()));
    }
    Ok(to_rate / from_rate)
}

/// Converts `request.amount` using `table`, tagging the result with `source`.
pub fn convert(
    table: &RateTable,
    request: &ConversionRequest,
    source: DataSource,
) -> Result<ConversionResult, RateError> {
    request.validate()?;
    let rate = resolve_rate(table, &request.from_currency, &request.to_currency)?;
    let converted_amount = request.amount * rate;
    if !converted_amount.is_finite() {
        return Err(RateError::invalid_amount(format!(
            "{} is too large to convert",
            request.amount
        )));
    }

    Ok(ConversionResult {
        from_currency: request.from_currency.clone(),
        to_currency: request.to_currency.clone(),
        amount: request.amount,
        rate,
        converted_amount,
        timestamp: Utc::now(),
        data_source: source,
    })
}
