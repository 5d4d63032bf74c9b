use crate::outcome::PairOutcome;
use chrono::NaiveDate;
use common::models::{CurrencyPair, HistoricalRatePoint};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// One date of the historical table, with a cell per configured pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRow {
    pub date: NaiveDate,
    /// Same order as `HistoricalTable::pairs`; `None` where a pair has no rate for the date
    pub cells: Vec<Option<HistoricalRatePoint>>,
}

/// Historical rates of all pairs merged by date, newest date first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalTable {
    pub pairs: Vec<CurrencyPair>,
    pub rows: Vec<HistoricalRow>,
}

impl HistoricalTable {
    pub fn from_outcomes(outcomes: &[PairOutcome]) -> Self {
        let mut dates = BTreeSet::new();
        let by_date: Vec<HashMap<NaiveDate, &HistoricalRatePoint>> = outcomes
            .iter()
            .map(|outcome| {
                outcome
                    .historical_series()
                    .unwrap_or_default()
                    .iter()
                    .map(|point| {
                        dates.insert(point.date);
                        (point.date, point)
                    })
                    .collect()
            })
            .collect();

        let rows = dates
            .into_iter()
            .rev()
            .map(|date| HistoricalRow {
                date,
                cells: by_date
                    .iter()
                    .map(|points| points.get(&date).map(|point| (*point).clone()))
                    .collect(),
            })
            .collect();

        Self {
            pairs: outcomes.iter().map(|o| o.pair.clone()).collect(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
