use crate::error::FetchError;
use common::models::{CurrencyPair, HistoricalRatePoint, LatestRateSample};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchKind {
    #[serde(rename = "latest")]
    Latest,
    #[serde(rename = "historical")]
    Historical,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::Latest => write!(f, "latest"),
            FetchKind::Historical => write!(f, "historical"),
        }
    }
}

/// Settled results of one refresh cycle for a single pair.
///
/// The two fetch kinds succeed or fail independently.
#[derive(Debug)]
pub struct PairOutcome {
    pub pair: CurrencyPair,
    pub latest: Result<LatestRateSample, FetchError>,
    pub historical: Result<Vec<HistoricalRatePoint>, FetchError>,
}

impl PairOutcome {
    pub fn latest_sample(&self) -> Option<&LatestRateSample> {
        self.latest.as_ref().ok()
    }

    pub fn historical_series(&self) -> Option<&[HistoricalRatePoint]> {
        self.historical.as_deref().ok()
    }
}
