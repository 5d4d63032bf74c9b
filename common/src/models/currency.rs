use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 style currency code (e.g., "USD", "JPY")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::ParseError(format!(
                "Invalid currency code: '{}'",
                s
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a pair of currencies whose exchange rate is tracked
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: CurrencyCode,   // Base currency (e.g., USD)
    pub symbol: CurrencyCode, // Quote currency (e.g., JPY)
}

impl CurrencyPair {
    pub fn new(base: CurrencyCode, symbol: CurrencyCode) -> Self {
        Self { base, symbol }
    }

    /// The pairs shown on the page when nothing else is configured
    pub fn default_pairs() -> Vec<CurrencyPair> {
        ["USD/JPY", "EUR/JPY"]
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.symbol)
    }
}

impl FromStr for CurrencyPair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, symbol) = s.split_once('/').ok_or_else(|| {
            Error::ParseError(format!("Invalid currency pair '{}', expected BASE/SYMBOL", s))
        })?;

        Ok(Self {
            base: base.parse()?,
            symbol: symbol.parse()?,
        })
    }
}
