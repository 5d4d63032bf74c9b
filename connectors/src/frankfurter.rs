use crate::RateConnector;
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use common::{
    models::{build_series, CurrencyPair, HistoricalRatePoint, LatestRateSample},
    Error, Result,
};
use serde_json::Value;
use tracing::{debug, error};

pub const FRANKFURTER_API_URL: &str = "https://api.frankfurter.dev/v1";
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Extra days requested on top of the wanted history, to cover weekends and
/// holidays with no published rate
pub const HISTORICAL_LOOKBACK_BUFFER_DAYS: u64 = 7;

pub struct FrankfurterConnector {
    client: reqwest::Client,
    base_url: String,
}

impl FrankfurterConnector {
    pub fn new() -> Result<Self> {
        Self::with_base_url(FRANKFURTER_API_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request made by the connector fails with a timeout error once
    /// `timeout` has elapsed.
    pub fn with_base_url(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(Error::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Frankfurter API error: {} - {}", status, error_text);
            return Err(Error::RateApiError(format!(
                "Frankfurter API responded with status {} - {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            Error::ParseError(format!("Failed to parse Frankfurter response: {}", e))
        })
    }

    async fn fetch_timeseries(
        &self,
        pair: &CurrencyPair,
        days: usize,
        end: NaiveDate,
    ) -> Result<Vec<HistoricalRatePoint>> {
        let (start, end) = timeseries_window(end, days)?;
        let url = format!("{}/timeseries", self.base_url);

        debug!(
            "Fetching historical rates from Frankfurter: {} ({}, start: {}, end: {})",
            url, pair, start, end
        );

        let payload = self
            .get_json(
                &url,
                &[
                    ("start", start.format("%Y-%m-%d").to_string()),
                    ("end", end.format("%Y-%m-%d").to_string()),
                    ("base", pair.base.to_string()),
                    ("symbols", pair.symbol.to_string()),
                ],
            )
            .await?;

        parse_timeseries(pair, &payload, days)
    }
}

/// Date range requested for `days` of history ending on `end`
fn timeseries_window(end: NaiveDate, days: usize) -> Result<(NaiveDate, NaiveDate)> {
    let start = u64::try_from(days)
        .ok()
        .and_then(|days| days.checked_add(HISTORICAL_LOOKBACK_BUFFER_DAYS))
        .and_then(|span| end.checked_sub_days(Days::new(span)))
        .ok_or_else(|| {
            Error::ParseError(format!(
                "History of {} days before {} is out of range",
                days, end
            ))
        })?;
    Ok((start, end))
}

// {"amount":1.0,"base":"USD","date":"2024-03-01","rates":{"JPY":150.12}}
fn parse_latest(pair: &CurrencyPair, payload: &Value) -> Result<LatestRateSample> {
    let rate = payload
        .get("rates")
        .and_then(|rates| rates.get(pair.symbol.as_str()))
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            Error::ParseError(format!(
                "Frankfurter response did not include a rate for {}",
                pair
            ))
        })?;

    let as_of = payload
        .get("date")
        .and_then(Value::as_str)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .ok_or_else(|| {
            Error::ParseError(format!(
                "Frankfurter response did not include a valid date for {}",
                pair
            ))
        })?;

    Ok(LatestRateSample {
        pair: pair.clone(),
        rate,
        as_of,
    })
}

// {"base":"USD","start_date":"...","end_date":"...","rates":{"2024-03-01":{"JPY":150.12},...}}
fn parse_timeseries(
    pair: &CurrencyPair,
    payload: &Value,
    days: usize,
) -> Result<Vec<HistoricalRatePoint>> {
    let rates = payload
        .get("rates")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            Error::ParseError(format!(
                "Frankfurter response did not include historical rates for {}",
                pair
            ))
        })?;

    let entries = rates.iter().filter_map(|(date, values)| {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let rate = values.get(pair.symbol.as_str())?.as_f64()?;
        Some((date, rate))
    });

    Ok(build_series(entries, days))
}

#[async_trait]
impl RateConnector for FrankfurterConnector {
    async fn get_latest_rate(&self, pair: &CurrencyPair) -> Result<LatestRateSample> {
        let url = format!("{}/latest", self.base_url);

        debug!("Fetching latest rate from Frankfurter: {} ({})", url, pair);

        let payload = self
            .get_json(
                &url,
                &[
                    ("base", pair.base.to_string()),
                    ("symbols", pair.symbol.to_string()),
                ],
            )
            .await?;

        parse_latest(pair, &payload)
    }

    async fn get_historical_series(
        &self,
        pair: &CurrencyPair,
        days: usize,
    ) -> Result<Vec<HistoricalRatePoint>> {
        self.fetch_timeseries(pair, days, Utc::now().date_naive())
            .await
    }
}
