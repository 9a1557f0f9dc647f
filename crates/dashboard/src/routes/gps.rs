//! GPS fix injection

use axum::{extract::State, http::StatusCode, Json};
use lap_timer::GpsFix;
use std::sync::Arc;

use super::ApiError;
use crate::tasks::SessionInput;
use crate::AppState;

/// Queue a fix for the session task, stamped with its arrival time
pub async fn post_fix(
    State(state): State<Arc<AppState>>,
    Json(fix): Json<GpsFix>,
) -> Result<StatusCode, ApiError> {
    let at_ms = state.clock.now_ms();
    state
        .session_tx
        .send(SessionInput::Fix { fix, at_ms })
        .await
        .map_err(|_| ApiError::Unavailable("session"))?;
    Ok(StatusCode::ACCEPTED)
}
