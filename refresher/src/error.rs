use crate::outcome::FetchKind;
use common::models::CurrencyPair;
use thiserror::Error;

/// A failed fetch, scoped to one pair and one fetch kind
#[derive(Error, Debug)]
#[error("{kind} fetch for {pair} failed: {source}")]
pub struct FetchError {
    pub pair: CurrencyPair,
    pub kind: FetchKind,
    #[source]
    pub source: common::Error,
}

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Unexpected error during refresh: {0}")]
    Unexpected(String),
}
