use crate::error::{FetchError, RefreshError};
use crate::handle::RefreshHandle;
use crate::outcome::{FetchKind, PairOutcome};
use crate::render::{HistoricalPlaceholder, RateRenderer};
use crate::summary::{reconcile, RefreshStatus, RefreshSummary};
use crate::table::HistoricalTable;
use chrono::{DateTime, Utc};
use common::models::{CurrencyPair, HistoricalRatePoint, LatestRateSample};
use connectors::RateConnector;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_HISTORY_DAYS: usize = 14;

const FETCHING_MESSAGE: &str = "最新のレートを取得しています...";

/// Pairs tracked by a controller and how much history to show for them
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub pairs: Vec<CurrencyPair>,
    pub history_days: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            pairs: CurrencyPair::default_pairs(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

/// Runs refresh cycles for a fixed list of pairs and renders their results.
///
/// At most one cycle is in flight per controller; a `refresh` issued while
/// another one runs returns immediately without touching the renderer.
pub struct RateRefreshController {
    connector: Arc<dyn RateConnector>,
    renderer: Arc<dyn RateRenderer>,
    config: RefreshConfig,
    refreshing: AtomicBool,
}

/// Clears the in-flight state when a cycle ends, however it ends
struct InFlight<'a> {
    controller: &'a RateRefreshController,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.controller.renderer.set_manual_refresh_enabled(true);
        self.controller.refreshing.store(false, Ordering::Release);
    }
}

impl RateRefreshController {
    pub fn new(
        connector: Arc<dyn RateConnector>,
        renderer: Arc<dyn RateRenderer>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            connector,
            renderer,
            config,
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn pairs(&self) -> &[CurrencyPair] {
        &self.config.pairs
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Refresh once right away and then every `interval`, until the returned
    /// handle is stopped or dropped.
    pub fn start(self: &Arc<Self>, interval: Duration) -> RefreshHandle {
        RefreshHandle::spawn(Arc::clone(self), interval)
    }

    /// Run one refresh cycle.
    ///
    /// Returns `Ok(None)` when another cycle was already in flight. An
    /// unexpected error leaves the renderer in the uniform error state and is
    /// returned after it has been logged.
    pub async fn refresh(&self) -> Result<Option<RefreshSummary>, RefreshError> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Rate refresh already in progress, skipping");
            return Ok(None);
        }
        let _in_flight = InFlight { controller: self };

        self.renderer.set_status_message(FETCHING_MESSAGE);
        self.renderer.set_manual_refresh_enabled(false);
        let fetched_at = Utc::now();

        let result = AssertUnwindSafe(self.run_cycle(fetched_at))
            .catch_unwind()
            .await
            .map_err(|panic| RefreshError::Unexpected(panic_message(panic)));

        match result {
            Ok(summary) => {
                info!(
                    "Rates refreshed ({}): latest {}/{} ok, historical {}/{} ok",
                    summary.status,
                    summary.latest_success_count,
                    summary.latest_success_count + summary.latest_failure_count,
                    summary.historical_success_count,
                    summary.historical_success_count + summary.historical_failure_count,
                );
                Ok(Some(summary))
            }
            Err(e) => {
                error!("Unexpected error while updating rates: {}", e);
                self.render_error_state();
                Err(e)
            }
        }
    }

    async fn run_cycle(&self, fetched_at: DateTime<Utc>) -> RefreshSummary {
        let outcomes = self.fetch_all().await;
        self.apply(&outcomes, fetched_at)
    }

    async fn fetch_all(&self) -> Vec<PairOutcome> {
        let pairs = &self.config.pairs;

        let (latest, historical) = futures::join!(
            join_all(pairs.iter().map(|pair| self.fetch_latest(pair))),
            join_all(pairs.iter().map(|pair| self.fetch_historical(pair))),
        );

        pairs
            .iter()
            .cloned()
            .zip(latest.into_iter().zip(historical))
            .map(|(pair, (latest, historical))| PairOutcome {
                pair,
                latest,
                historical,
            })
            .collect()
    }

    async fn fetch_latest(&self, pair: &CurrencyPair) -> Result<LatestRateSample, FetchError> {
        self.connector
            .get_latest_rate(pair)
            .await
            .map_err(|source| {
                error!("Failed to fetch rate for {}: {}", pair, source);
                FetchError {
                    pair: pair.clone(),
                    kind: FetchKind::Latest,
                    source,
                }
            })
    }

    async fn fetch_historical(
        &self,
        pair: &CurrencyPair,
    ) -> Result<Vec<HistoricalRatePoint>, FetchError> {
        self.connector
            .get_historical_series(pair, self.config.history_days)
            .await
            .map_err(|source| {
                error!("Failed to fetch historical data for {}: {}", pair, source);
                FetchError {
                    pair: pair.clone(),
                    kind: FetchKind::Historical,
                    source,
                }
            })
    }

    fn apply(&self, outcomes: &[PairOutcome], fetched_at: DateTime<Utc>) -> RefreshSummary {
        debug_assert_eq!(outcomes.len(), self.config.pairs.len());

        let summary = reconcile(outcomes, fetched_at);
        let renderer = &self.renderer;

        let rows: Vec<(&CurrencyPair, Option<&LatestRateSample>)> = outcomes
            .iter()
            .map(|outcome| (&outcome.pair, outcome.latest_sample()))
            .collect();
        renderer.render_latest_rows(&rows);
        renderer.set_data_date(summary.most_recent_as_of);
        renderer.set_last_updated(summary.last_updated());

        if summary.historical_unavailable() {
            renderer.render_historical_placeholder(HistoricalPlaceholder::Unavailable);
        } else {
            let table = HistoricalTable::from_outcomes(outcomes);
            if table.is_empty() {
                renderer.render_historical_placeholder(HistoricalPlaceholder::NoData);
            } else {
                renderer.render_historical_table(&table);
            }
        }

        renderer.set_status_message(summary.status.message());

        summary
    }

    /// Every row marked as failed, nothing left over from earlier cycles
    fn render_error_state(&self) {
        let renderer = &self.renderer;

        let rows: Vec<(&CurrencyPair, Option<&LatestRateSample>)> =
            self.config.pairs.iter().map(|pair| (pair, None)).collect();
        renderer.render_latest_rows(&rows);
        renderer.render_historical_placeholder(HistoricalPlaceholder::Unavailable);
        renderer.set_data_date(None);
        renderer.set_last_updated(None);
        renderer.set_status_message(RefreshStatus::TotalFailure.message());
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "refresh cycle panicked".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use common::models::build_series;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    pub(crate) fn pair(s: &str) -> CurrencyPair {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Canned responses per pair; pairs without an entry fail
    #[derive(Default)]
    pub(crate) struct FakeConnector {
        latest: HashMap<CurrencyPair, (f64, &'static str)>,
        historical: HashMap<CurrencyPair, Vec<(NaiveDate, f64)>>,
        gate: Option<Arc<Semaphore>>,
        latest_calls: AtomicUsize,
        historical_calls: AtomicUsize,
    }

    impl FakeConnector {
        pub(crate) fn with_latest(mut self, p: &str, rate: f64, as_of: &'static str) -> Self {
            self.latest.insert(pair(p), (rate, as_of));
            self
        }

        pub(crate) fn with_history(mut self, p: &str, first: &str, days: u32) -> Self {
            let first = date(first);
            let points = (0..days)
                .map(|d| (first + chrono::Duration::days(d as i64), 150.0 + d as f64))
                .collect();
            self.historical.insert(pair(p), points);
            self
        }

        fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub(crate) fn latest_calls(&self) -> usize {
            self.latest_calls.load(Ordering::SeqCst)
        }

        async fn wait_gate(&self) {
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
        }
    }

    #[async_trait]
    impl RateConnector for FakeConnector {
        async fn get_latest_rate(&self, pair: &CurrencyPair) -> common::Result<LatestRateSample> {
            self.latest_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate().await;
            let (rate, as_of) = self.latest.get(pair).ok_or_else(|| {
                common::Error::RateApiError("connection reset by peer".to_string())
            })?;
            Ok(LatestRateSample {
                pair: pair.clone(),
                rate: *rate,
                as_of: date(as_of),
            })
        }

        async fn get_historical_series(
            &self,
            pair: &CurrencyPair,
            days: usize,
        ) -> common::Result<Vec<HistoricalRatePoint>> {
            self.historical_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_gate().await;
            let points = self.historical.get(pair).ok_or_else(|| {
                common::Error::RateApiError("500 Internal Server Error".to_string())
            })?;
            Ok(build_series(points.iter().copied(), days))
        }
    }

    #[derive(Debug, Default, Clone)]
    pub(crate) struct Recorded {
        pub latest_rows: Vec<(CurrencyPair, Option<LatestRateSample>)>,
        pub table: Option<HistoricalTable>,
        pub placeholder: Option<HistoricalPlaceholder>,
        pub status: Option<String>,
        pub data_date: Option<NaiveDate>,
        pub last_updated: Option<DateTime<Utc>>,
        pub manual_refresh_enabled: Vec<bool>,
    }

    #[derive(Default)]
    pub(crate) struct RecordingRenderer {
        recorded: Mutex<Recorded>,
        panic_on_table: AtomicBool,
    }

    impl RecordingRenderer {
        pub(crate) fn recorded(&self) -> Recorded {
            self.recorded.lock().unwrap().clone()
        }
    }

    impl RateRenderer for RecordingRenderer {
        fn render_latest_rows(&self, rows: &[(&CurrencyPair, Option<&LatestRateSample>)]) {
            self.recorded.lock().unwrap().latest_rows = rows
                .iter()
                .map(|(pair, sample)| ((*pair).clone(), sample.cloned()))
                .collect();
        }

        fn render_historical_table(&self, table: &HistoricalTable) {
            if self.panic_on_table.swap(false, Ordering::SeqCst) {
                panic!("table renderer blew up");
            }
            let mut recorded = self.recorded.lock().unwrap();
            recorded.table = Some(table.clone());
            recorded.placeholder = None;
        }

        fn render_historical_placeholder(&self, placeholder: HistoricalPlaceholder) {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.table = None;
            recorded.placeholder = Some(placeholder);
        }

        fn set_status_message(&self, message: &str) {
            self.recorded.lock().unwrap().status = Some(message.to_string());
        }

        fn set_data_date(&self, date: Option<NaiveDate>) {
            self.recorded.lock().unwrap().data_date = date;
        }

        fn set_last_updated(&self, timestamp: Option<DateTime<Utc>>) {
            self.recorded.lock().unwrap().last_updated = timestamp;
        }

        fn set_manual_refresh_enabled(&self, enabled: bool) {
            self.recorded
                .lock()
                .unwrap()
                .manual_refresh_enabled
                .push(enabled);
        }
    }

    pub(crate) fn controller(
        connector: FakeConnector,
        pairs: &[&str],
    ) -> (
        Arc<RateRefreshController>,
        Arc<FakeConnector>,
        Arc<RecordingRenderer>,
    ) {
        let connector = Arc::new(connector);
        let renderer = Arc::new(RecordingRenderer::default());
        let config = RefreshConfig {
            pairs: pairs.iter().map(|p| pair(p)).collect(),
            history_days: DEFAULT_HISTORY_DAYS,
        };
        let controller = Arc::new(RateRefreshController::new(
            connector.clone(),
            renderer.clone(),
            config,
        ));
        (controller, connector, renderer)
    }

    #[tokio::test]
    async fn single_pair_full_success() {
        let connector = FakeConnector::default()
            .with_latest("USD/JPY", 150.1234, "2024-03-01")
            .with_history("USD/JPY", "2024-02-20", 10);
        let (controller, _, renderer) = controller(connector, &["USD/JPY"]);

        let summary = controller.refresh().await.unwrap().unwrap();

        assert_eq!(summary.latest_success_count, 1);
        assert_eq!(summary.historical_success_count, 1);
        assert_eq!(summary.status, RefreshStatus::FullyRefreshed);

        let recorded = renderer.recorded();
        assert_eq!(recorded.last_updated, Some(summary.fetched_at));
        assert_eq!(recorded.data_date, Some(date("2024-03-01")));
        assert_eq!(recorded.table.as_ref().unwrap().rows.len(), 10);
        assert_eq!(recorded.placeholder, None);
        assert_eq!(
            recorded.status.as_deref(),
            Some(RefreshStatus::FullyRefreshed.message())
        );
        assert_eq!(recorded.latest_rows.len(), 1);
        assert_eq!(recorded.latest_rows[0].1.as_ref().unwrap().rate, 150.1234);
    }

    #[tokio::test]
    async fn one_latest_failure_is_partial_latest() {
        let connector = FakeConnector::default()
            .with_latest("USD/JPY", 150.1234, "2024-03-01")
            .with_history("USD/JPY", "2024-02-20", 10)
            .with_history("EUR/JPY", "2024-02-20", 10);
        let (controller, _, renderer) = controller(connector, &["USD/JPY", "EUR/JPY"]);

        let summary = controller.refresh().await.unwrap().unwrap();

        assert_eq!(summary.latest_success_count, 1);
        assert_eq!(summary.latest_failure_count, 1);
        assert_eq!(summary.status, RefreshStatus::PartialLatest);
        assert_eq!(summary.most_recent_as_of, Some(date("2024-03-01")));

        let recorded = renderer.recorded();
        assert_eq!(recorded.latest_rows.len(), 2);
        assert_eq!(recorded.latest_rows[0].0, pair("USD/JPY"));
        assert!(recorded.latest_rows[0].1.is_some());
        assert_eq!(recorded.latest_rows[1].0, pair("EUR/JPY"));
        assert!(recorded.latest_rows[1].1.is_none());
        assert!(recorded.last_updated.is_some());
    }

    #[tokio::test]
    async fn all_historical_failures_show_unavailable() {
        let connector = FakeConnector::default()
            .with_latest("USD/JPY", 150.0, "2024-03-01")
            .with_latest("EUR/JPY", 163.0, "2024-03-01");
        let (controller, _, renderer) = controller(connector, &["USD/JPY", "EUR/JPY"]);

        let summary = controller.refresh().await.unwrap().unwrap();

        assert_eq!(summary.status, RefreshStatus::PartialHistorical);
        let recorded = renderer.recorded();
        assert_eq!(recorded.placeholder, Some(HistoricalPlaceholder::Unavailable));
        assert!(recorded.table.is_none());
    }

    #[tokio::test]
    async fn total_failure_keeps_last_updated_empty() {
        let (controller, _, renderer) = controller(FakeConnector::default(), &["USD/JPY"]);

        let summary = controller.refresh().await.unwrap().unwrap();

        assert_eq!(summary.status, RefreshStatus::TotalFailure);
        let recorded = renderer.recorded();
        assert_eq!(recorded.last_updated, None);
        assert_eq!(recorded.data_date, None);
        assert_eq!(recorded.placeholder, Some(HistoricalPlaceholder::Unavailable));
        assert_eq!(recorded.manual_refresh_enabled, vec![false, true]);
    }

    #[tokio::test]
    async fn empty_history_shows_no_data() {
        let connector = FakeConnector::default()
            .with_latest("USD/JPY", 150.0, "2024-03-01")
            .with_history("USD/JPY", "2024-03-01", 0);
        let (controller, _, renderer) = controller(connector, &["USD/JPY"]);

        let summary = controller.refresh().await.unwrap().unwrap();

        assert_eq!(summary.status, RefreshStatus::FullyRefreshed);
        assert_eq!(
            renderer.recorded().placeholder,
            Some(HistoricalPlaceholder::NoData)
        );
    }

    #[tokio::test]
    async fn overlapping_refresh_is_a_no_op() {
        let gate = Arc::new(Semaphore::new(0));
        let connector = FakeConnector::default()
            .with_latest("USD/JPY", 150.0, "2024-03-01")
            .with_history("USD/JPY", "2024-02-20", 5)
            .gated(gate.clone());
        let (controller, connector, renderer) = controller(connector, &["USD/JPY"]);

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.refresh().await }
        });
        while !controller.is_refreshing() {
            tokio::task::yield_now().await;
        }

        let before = renderer.recorded();
        assert!(matches!(controller.refresh().await, Ok(None)));
        let after = renderer.recorded();
        assert_eq!(before.manual_refresh_enabled, vec![false]);
        assert_eq!(after.manual_refresh_enabled, vec![false]);
        assert_eq!(after.status, before.status);

        gate.add_permits(1);
        let summary = first.await.unwrap().unwrap();
        assert!(summary.is_some());
        assert_eq!(connector.latest_calls(), 1);
        assert!(!controller.is_refreshing());
        assert_eq!(renderer.recorded().manual_refresh_enabled, vec![false, true]);
    }

    #[tokio::test]
    async fn controllers_do_not_share_the_guard() {
        let gate = Arc::new(Semaphore::new(0));
        let blocked = FakeConnector::default().gated(gate.clone());
        let (first, _, _) = controller(blocked, &["USD/JPY"]);
        let free = FakeConnector::default().with_latest("USD/JPY", 150.0, "2024-03-01");
        let (second, _, _) = controller(free, &["USD/JPY"]);

        let pending = tokio::spawn({
            let first = first.clone();
            async move { first.refresh().await }
        });
        while !first.is_refreshing() {
            tokio::task::yield_now().await;
        }

        assert!(second.refresh().await.unwrap().is_some());

        gate.add_permits(1);
        assert!(pending.await.unwrap().unwrap().is_some());
    }

    #[tokio::test]
    async fn panic_during_rendering_degrades_to_error_state() {
        let connector = FakeConnector::default()
            .with_latest("USD/JPY", 150.0, "2024-03-01")
            .with_latest("EUR/JPY", 163.0, "2024-03-01")
            .with_history("USD/JPY", "2024-02-20", 5)
            .with_history("EUR/JPY", "2024-02-20", 5);
        let (controller, _, renderer) = controller(connector, &["USD/JPY", "EUR/JPY"]);
        renderer.panic_on_table.store(true, Ordering::SeqCst);

        let result = controller.refresh().await;

        assert!(matches!(result, Err(RefreshError::Unexpected(ref msg)) if msg.contains("blew up")));
        let recorded = renderer.recorded();
        assert_eq!(recorded.latest_rows.len(), 2);
        assert!(recorded.latest_rows.iter().all(|(_, sample)| sample.is_none()));
        assert_eq!(recorded.placeholder, Some(HistoricalPlaceholder::Unavailable));
        assert_eq!(recorded.last_updated, None);
        assert_eq!(recorded.data_date, None);
        assert_eq!(
            recorded.status.as_deref(),
            Some(RefreshStatus::TotalFailure.message())
        );
        assert_eq!(recorded.manual_refresh_enabled, vec![false, true]);
        assert!(!controller.is_refreshing());

        // the next cycle runs normally again
        let summary = controller.refresh().await.unwrap().unwrap();
        assert_eq!(summary.status, RefreshStatus::FullyRefreshed);
        assert!(renderer.recorded().table.is_some());
    }
}
