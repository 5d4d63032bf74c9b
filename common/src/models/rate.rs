use crate::models::CurrencyPair;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Most recent published rate for a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestRateSample {
    /// Currency pair (e.g., USD/JPY)
    pub pair: CurrencyPair,
    /// Units of `pair.symbol` per one unit of `pair.base`
    pub rate: f64,
    /// Publication date reported by the rate API
    pub as_of: NaiveDate,
}

/// One day of a historical rate series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRatePoint {
    pub date: NaiveDate,
    pub rate: f64,
    /// Fractional change against the preceding point, if there is one with a non-zero rate
    pub change: Option<f64>,
}

/// Builds a chronological series out of raw `(date, rate)` entries.
///
/// Entries are deduplicated by date (the last one wins) and sorted ascending.
/// Changes are computed over the full sorted series, which is then trimmed to
/// the `max_points` most recent points.
pub fn build_series<I>(entries: I, max_points: usize) -> Vec<HistoricalRatePoint>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let ordered: BTreeMap<NaiveDate, f64> = entries.into_iter().collect();

    let mut previous: Option<f64> = None;
    let mut points: Vec<HistoricalRatePoint> = ordered
        .into_iter()
        .map(|(date, rate)| {
            let change = match previous {
                Some(prev) if prev != 0.0 => Some((rate - prev) / prev),
                _ => None,
            };
            previous = Some(rate);
            HistoricalRatePoint { date, rate, change }
        })
        .collect();

    if points.len() > max_points {
        points.drain(..points.len() - max_points);
    }

    points
}
