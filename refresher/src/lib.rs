mod controller;
mod error;
mod handle;
mod outcome;
mod render;
mod summary;
mod table;

pub use controller::{
    RateRefreshController, RefreshConfig, DEFAULT_HISTORY_DAYS, DEFAULT_REFRESH_INTERVAL,
};
pub use error::{FetchError, RefreshError};
pub use handle::RefreshHandle;
pub use outcome::{FetchKind, PairOutcome};
pub use render::{HistoricalPlaceholder, RateRenderer};
pub use summary::{reconcile, RefreshStatus, RefreshSummary};
pub use table::{HistoricalRow, HistoricalTable};
