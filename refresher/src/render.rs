use crate::table::HistoricalTable;
use chrono::{DateTime, NaiveDate, Utc};
use common::models::{CurrencyPair, LatestRateSample};
use serde::Serialize;

/// Shown in place of the historical table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalPlaceholder {
    /// Fetches succeeded but returned no dated rates
    NoData,
    /// Every historical fetch failed
    Unavailable,
}

/// Surface the refresh controller renders onto.
///
/// Updates are synchronous and only ever issued from within one refresh cycle
/// at a time.
pub trait RateRenderer: Send + Sync {
    /// Replace the latest-rate rows, one per pair in order; `None` renders the error marker
    fn render_latest_rows(&self, rows: &[(&CurrencyPair, Option<&LatestRateSample>)]);

    fn render_historical_table(&self, table: &HistoricalTable);

    fn render_historical_placeholder(&self, placeholder: HistoricalPlaceholder);

    fn set_status_message(&self, message: &str);

    /// Publication date of the newest latest rate
    fn set_data_date(&self, date: Option<NaiveDate>);

    fn set_last_updated(&self, timestamp: Option<DateTime<Utc>>);

    fn set_manual_refresh_enabled(&self, enabled: bool);
}
