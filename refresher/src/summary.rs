use crate::outcome::PairOutcome;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// Overall classification of a refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    FullyRefreshed,
    TotalFailure,
    PartialBoth,
    PartialLatest,
    PartialHistorical,
}

impl RefreshStatus {
    /// Status line shown to the reader
    pub fn message(&self) -> &'static str {
        match self {
            RefreshStatus::FullyRefreshed => "最新のレートと過去2週間のデータを取得しました。",
            RefreshStatus::TotalFailure => {
                "レートを取得できませんでした。時間をおいて再度お試しください。"
            }
            RefreshStatus::PartialBoth => "最新と過去の一部データを取得できませんでした。",
            RefreshStatus::PartialLatest => "最新レートの一部を取得できませんでした。",
            RefreshStatus::PartialHistorical => "過去データの一部を取得できませんでした。",
        }
    }
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshStatus::FullyRefreshed => write!(f, "fully refreshed"),
            RefreshStatus::TotalFailure => write!(f, "total failure, retry later"),
            RefreshStatus::PartialBoth => write!(f, "partial failure, both kinds"),
            RefreshStatus::PartialLatest => write!(f, "partial failure, latest"),
            RefreshStatus::PartialHistorical => write!(f, "partial failure, historical"),
        }
    }
}

/// Aggregate over all pairs for one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshSummary {
    pub latest_success_count: usize,
    pub latest_failure_count: usize,
    pub historical_success_count: usize,
    pub historical_failure_count: usize,
    /// Newest publication date among the successful latest fetches
    pub most_recent_as_of: Option<NaiveDate>,
    /// When the cycle started fetching
    pub fetched_at: DateTime<Utc>,
    pub status: RefreshStatus,
}

impl RefreshSummary {
    /// Timestamp to show as "last updated", only when some latest rate was fetched
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        (self.latest_success_count > 0).then_some(self.fetched_at)
    }

    /// Whether the historical table has to be replaced by the "unavailable" placeholder
    pub fn historical_unavailable(&self) -> bool {
        self.historical_success_count == 0 && self.historical_failure_count > 0
    }
}

/// Folds the settled per-pair outcomes of a cycle into its summary.
pub fn reconcile(outcomes: &[PairOutcome], fetched_at: DateTime<Utc>) -> RefreshSummary {
    let mut latest_success_count = 0;
    let mut latest_failure_count = 0;
    let mut historical_success_count = 0;
    let mut historical_failure_count = 0;
    let mut most_recent_as_of: Option<NaiveDate> = None;

    for outcome in outcomes {
        match &outcome.latest {
            Ok(sample) => {
                latest_success_count += 1;
                if most_recent_as_of.map_or(true, |date| sample.as_of > date) {
                    most_recent_as_of = Some(sample.as_of);
                }
            }
            Err(_) => latest_failure_count += 1,
        }

        match &outcome.historical {
            Ok(_) => historical_success_count += 1,
            Err(_) => historical_failure_count += 1,
        }
    }

    let status = classify(
        latest_success_count,
        latest_failure_count,
        historical_success_count,
        historical_failure_count,
    );

    RefreshSummary {
        latest_success_count,
        latest_failure_count,
        historical_success_count,
        historical_failure_count,
        most_recent_as_of,
        fetched_at,
        status,
    }
}

fn classify(
    latest_success: usize,
    latest_failure: usize,
    historical_success: usize,
    historical_failure: usize,
) -> RefreshStatus {
    if latest_failure == 0 && historical_failure == 0 {
        RefreshStatus::FullyRefreshed
    } else if latest_success == 0 && historical_success == 0 {
        RefreshStatus::TotalFailure
    } else if latest_failure > 0 && historical_failure > 0 {
        RefreshStatus::PartialBoth
    } else if latest_failure > 0 {
        RefreshStatus::PartialLatest
    } else {
        RefreshStatus::PartialHistorical
    }
}
