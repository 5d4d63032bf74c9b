use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use refresher::RefreshHandle;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::display::{DisplayBoard, DisplaySnapshot};

pub struct AppState {
    pub board: Arc<DisplayBoard>,
    pub refresh: RefreshHandle,
}

pub type SharedState = Arc<AppState>;

pub enum ApiError {
    /// The manual refresh control is disabled while a cycle runs
    RefreshInProgress,
    RefreshStopped,
}

// Convert our API error to an Axum response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::RefreshInProgress => (
                StatusCode::CONFLICT,
                "A rate refresh is already in progress".to_string(),
            ),
            ApiError::RefreshStopped => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Rate refreshing has been stopped".to_string(),
            ),
        };

        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub status: &'static str,
}

// Everything currently displayed on the rates page
pub async fn get_rates(State(state): State<SharedState>) -> Json<DisplaySnapshot> {
    Json(state.board.snapshot())
}

// Same as pressing the refresh button
pub async fn refresh_rates(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<RefreshAccepted>), ApiError> {
    if !state.board.manual_refresh_enabled() {
        return Err(ApiError::RefreshInProgress);
    }

    if !state.refresh.request_refresh() {
        return Err(ApiError::RefreshStopped);
    }

    debug!("Manual rate refresh accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshAccepted {
            status: "refresh requested",
        }),
    ))
}
