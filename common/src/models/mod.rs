mod currency;
mod rate;

pub use currency::{CurrencyCode, CurrencyPair};
pub use rate::{build_series, HistoricalRatePoint, LatestRateSample};
