pub mod frankfurter;

use async_trait::async_trait;
use common::{
    models::{CurrencyPair, HistoricalRatePoint, LatestRateSample},
    Result,
};

/// Trait defining the interface for exchange-rate API clients
#[async_trait]
pub trait RateConnector: Send + Sync {
    /// Get the most recent published rate for a currency pair
    async fn get_latest_rate(&self, pair: &CurrencyPair) -> Result<LatestRateSample>;

    /// Get the `days` most recent daily rates for a currency pair, oldest first
    async fn get_historical_series(
        &self,
        pair: &CurrencyPair,
        days: usize,
    ) -> Result<Vec<HistoricalRatePoint>>;
}
