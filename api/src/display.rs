use crate::format::{
    change_direction, format_change, format_date, format_date_time, format_rate, ChangeDirection,
    EMPTY_CELL,
};
use chrono::{DateTime, NaiveDate, Utc};
use common::models::{CurrencyPair, LatestRateSample};
use refresher::{HistoricalPlaceholder, HistoricalTable, RateRenderer};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};

const LATEST_ERROR_MARKER: &str = "取得エラー";
const NO_DATA_MESSAGE: &str = "データがありません。";
const UNAVAILABLE_MESSAGE: &str = "レートを取得できませんでした。";

/// One row of the latest-rates table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestRowView {
    pub pair: String,
    pub rate: String,
    pub date: String,
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalCellView {
    pub rate: String,
    pub change: String,
    pub direction: ChangeDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRowView {
    pub date: String,
    pub cells: Vec<HistoricalCellView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoricalView {
    Table {
        columns: Vec<String>,
        rows: Vec<HistoricalRowView>,
    },
    Placeholder {
        message: String,
    },
}

/// Everything currently shown on the rates page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub latest: Vec<LatestRowView>,
    pub historical: HistoricalView,
    pub status: String,
    pub data_date: String,
    pub last_updated: String,
    pub manual_refresh_enabled: bool,
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self {
            latest: Vec::new(),
            historical: HistoricalView::Placeholder {
                message: NO_DATA_MESSAGE.to_string(),
            },
            status: String::new(),
            data_date: EMPTY_CELL.to_string(),
            last_updated: EMPTY_CELL.to_string(),
            manual_refresh_enabled: true,
        }
    }
}

/// In-memory rendering surface holding the formatted rates page
#[derive(Debug, Default)]
pub struct DisplayBoard {
    snapshot: RwLock<DisplaySnapshot>,
}

impl DisplayBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn manual_refresh_enabled(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .manual_refresh_enabled
    }

    fn update(&self, f: impl FnOnce(&mut DisplaySnapshot)) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut snapshot);
    }
}

fn pair_label(pair: &CurrencyPair) -> String {
    format!("{} / {}", pair.base, pair.symbol)
}

impl RateRenderer for DisplayBoard {
    fn render_latest_rows(&self, rows: &[(&CurrencyPair, Option<&LatestRateSample>)]) {
        // formatted up front so readers never see a half-built table
        let latest = rows
            .iter()
            .map(|(pair, sample)| match sample {
                Some(sample) => LatestRowView {
                    pair: pair_label(pair),
                    rate: format_rate(sample.rate),
                    date: format_date(sample.as_of),
                    error: false,
                },
                None => LatestRowView {
                    pair: pair_label(pair),
                    rate: LATEST_ERROR_MARKER.to_string(),
                    date: EMPTY_CELL.to_string(),
                    error: true,
                },
            })
            .collect();
        self.update(|s| s.latest = latest);
    }

    fn render_historical_table(&self, table: &HistoricalTable) {
        let columns = table.pairs.iter().map(pair_label).collect();
        let rows = table
            .rows
            .iter()
            .map(|row| HistoricalRowView {
                date: format_date(row.date),
                cells: row
                    .cells
                    .iter()
                    .map(|cell| {
                        let change = cell.as_ref().and_then(|point| point.change);
                        HistoricalCellView {
                            rate: cell
                                .as_ref()
                                .map_or_else(|| EMPTY_CELL.to_string(), |p| format_rate(p.rate)),
                            change: format_change(change),
                            direction: change_direction(change),
                        }
                    })
                    .collect(),
            })
            .collect();

        self.update(|s| s.historical = HistoricalView::Table { columns, rows });
    }

    fn render_historical_placeholder(&self, placeholder: HistoricalPlaceholder) {
        let message = match placeholder {
            HistoricalPlaceholder::NoData => NO_DATA_MESSAGE,
            HistoricalPlaceholder::Unavailable => UNAVAILABLE_MESSAGE,
        };
        self.update(|s| {
            s.historical = HistoricalView::Placeholder {
                message: message.to_string(),
            }
        });
    }

    fn set_status_message(&self, message: &str) {
        self.update(|s| s.status = message.to_string());
    }

    fn set_data_date(&self, date: Option<NaiveDate>) {
        let date = date.map_or_else(|| EMPTY_CELL.to_string(), format_date);
        self.update(|s| s.data_date = date);
    }

    fn set_last_updated(&self, timestamp: Option<DateTime<Utc>>) {
        let timestamp = timestamp.map_or_else(|| EMPTY_CELL.to_string(), format_date_time);
        self.update(|s| s.last_updated = timestamp);
    }

    fn set_manual_refresh_enabled(&self, enabled: bool) {
        self.update(|s| s.manual_refresh_enabled = enabled);
    }
}
