use common::{models::CurrencyPair, Error, Result};
use connectors::frankfurter::{DEFAULT_REQUEST_TIMEOUT, FRANKFURTER_API_URL};
use refresher::{RefreshConfig, DEFAULT_HISTORY_DAYS, DEFAULT_REFRESH_INTERVAL};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for `FX_HISTORY_DAYS`, one year of daily rates
const MAX_HISTORY_DAYS: usize = 365;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Settings for fetching and refreshing exchange rates
#[derive(Debug, Clone)]
pub struct RatesConfig {
    /// Frankfurter API root, e.g. `https://api.frankfurter.dev/v1`
    pub api_base_url: String,
    pub pairs: Vec<CurrencyPair>,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub history_days: usize,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            api_base_url: FRANKFURTER_API_URL.to_string(),
            pairs: CurrencyPair::default_pairs(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

impl RatesConfig {
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            pairs: self.pairs.clone(),
            history_days: self.history_days,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub rates: RatesConfig,
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults for unset ones
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = AppConfig::default();

        let api = ApiConfig {
            host: lookup("API_HOST").unwrap_or(defaults.api.host),
            port: parse_var(&lookup, "API_PORT")?.unwrap_or(defaults.api.port),
        };

        let pairs = match lookup("FX_RATE_PAIRS") {
            Some(value) => parse_pairs(&value)?,
            None => defaults.rates.pairs,
        };

        let refresh_interval = match parse_var::<u64>(&lookup, "FX_REFRESH_INTERVAL_SECS")? {
            Some(0) => {
                return Err(Error::ConfigError(
                    "FX_REFRESH_INTERVAL_SECS must be greater than zero".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.rates.refresh_interval,
        };

        let request_timeout = match parse_var::<u64>(&lookup, "FX_REQUEST_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(Error::ConfigError(
                    "FX_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.rates.request_timeout,
        };

        let history_days = match parse_var::<usize>(&lookup, "FX_HISTORY_DAYS")? {
            Some(days) if !(1..=MAX_HISTORY_DAYS).contains(&days) => {
                return Err(Error::ConfigError(format!(
                    "FX_HISTORY_DAYS must be between 1 and {}",
                    MAX_HISTORY_DAYS
                )))
            }
            Some(days) => days,
            None => defaults.rates.history_days,
        };

        let rates = RatesConfig {
            api_base_url: lookup("FX_API_BASE_URL").unwrap_or(defaults.rates.api_base_url),
            pairs,
            refresh_interval,
            request_timeout,
            history_days,
        };

        Ok(Self { api, rates })
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    lookup(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| {
                Error::ConfigError(format!("Invalid value for {}: '{}'", key, value))
            })
        })
        .transpose()
}

/// `USD/JPY,EUR/JPY` -> pairs in the given order
fn parse_pairs(value: &str) -> Result<Vec<CurrencyPair>> {
    let pairs = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<CurrencyPair>().map_err(|e| {
                Error::ConfigError(format!("Invalid value for FX_RATE_PAIRS: {}", e))
            })
        })
        .collect::<Result<Vec<CurrencyPair>>>()?;

    if pairs.is_empty() {
        return Err(Error::ConfigError(
            "FX_RATE_PAIRS must name at least one pair".to_string(),
        ));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();

        assert_eq!(config.api.port, 3000);
        assert_eq!(config.rates.api_base_url, FRANKFURTER_API_URL);
        assert_eq!(config.rates.pairs, CurrencyPair::default_pairs());
        assert_eq!(config.rates.refresh_interval, Duration::from_secs(3600));
        assert_eq!(config.rates.request_timeout, Duration::from_secs(30));
        assert_eq!(config.rates.history_days, 14);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "8080"),
            ("FX_API_BASE_URL", "http://localhost:9000"),
            ("FX_RATE_PAIRS", "gbp/jpy, USD/EUR ,"),
            ("FX_REFRESH_INTERVAL_SECS", "600"),
            ("FX_REQUEST_TIMEOUT_SECS", "5"),
            ("FX_HISTORY_DAYS", "7"),
        ])
        .unwrap();

        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.rates.api_base_url, "http://localhost:9000");
        let pairs: Vec<String> = config.rates.pairs.iter().map(ToString::to_string).collect();
        assert_eq!(pairs, vec!["GBP/JPY", "USD/EUR"]);
        assert_eq!(config.rates.refresh_interval, Duration::from_secs(600));
        assert_eq!(config.rates.request_timeout, Duration::from_secs(5));
        assert_eq!(config.rates.refresh_config().history_days, 7);
    }

    #[test]
    fn accepts_a_full_year_of_history() {
        let config = load(&[("FX_HISTORY_DAYS", "365")]).unwrap();
        assert_eq!(config.rates.history_days, MAX_HISTORY_DAYS);
    }

    #[test]
    fn rejects_malformed_values() {
        for vars in [
            [("API_PORT", "http")],
            [("FX_RATE_PAIRS", "USDJPY")],
            [("FX_RATE_PAIRS", " , ")],
            [("FX_REFRESH_INTERVAL_SECS", "0")],
            [("FX_REFRESH_INTERVAL_SECS", "-5")],
            [("FX_REQUEST_TIMEOUT_SECS", "0")],
            [("FX_HISTORY_DAYS", "0")],
            [("FX_HISTORY_DAYS", "366")],
            [("FX_HISTORY_DAYS", "1000000000")],
        ] {
            assert!(
                matches!(load(&vars), Err(Error::ConfigError(_))),
                "{:?} should be rejected",
                vars
            );
        }
    }
}
