//! Operator command routes

use axum::{
    extract::{Path, State},
    Json,
};
use fuel_integrator::FuelReading;
use lap_timer::OdometerReading;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

use super::ApiError;
use crate::tasks::{save_distance, save_fuel, today, CommandReply, SessionCommand, SessionInput};
use crate::AppState;

/// Body of a fuel reset; an absent amount means a full tank
#[derive(Debug, Default, Deserialize)]
pub struct ResetFuelRequest {
    pub remaining_ml: Option<f64>,
}

/// Body of a tire change
#[derive(Debug, Deserialize)]
pub struct SelectTireRequest {
    pub tire: String,
}

async fn send_command(state: &AppState, command: SessionCommand) -> Result<Json<CommandReply>, ApiError> {
    let (reply, response) = oneshot::channel();
    state
        .session_tx
        .send(SessionInput::Command { command, reply })
        .await
        .map_err(|_| ApiError::Unavailable("session"))?;

    let result = response.await.map_err(|_| ApiError::Unavailable("session"))?;
    Ok(Json(result?))
}

pub async fn set_start_line(State(state): State<Arc<AppState>>) -> Result<Json<CommandReply>, ApiError> {
    send_command(&state, SessionCommand::SetStartLine).await
}

pub async fn set_sector(
    State(state): State<Arc<AppState>>,
    Path(index): Path<u32>,
) -> Result<Json<CommandReply>, ApiError> {
    send_command(&state, SessionCommand::SetSector(index)).await
}

pub async fn calibrate(State(state): State<Arc<AppState>>) -> Result<Json<CommandReply>, ApiError> {
    send_command(&state, SessionCommand::Calibrate).await
}

pub async fn reset_session(State(state): State<Arc<AppState>>) -> Result<Json<CommandReply>, ApiError> {
    send_command(&state, SessionCommand::ResetSession).await
}

/// Operator refuel. Saved immediately rather than on the next period.
pub async fn reset_fuel(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ResetFuelRequest>>,
) -> Result<Json<FuelReading>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let remaining = request
        .remaining_ml
        .unwrap_or_else(|| state.fuel.tank_capacity());

    state.fuel.reset(remaining)?;
    save_fuel(&state.fuel, &state.fuel_store).await;

    let reading = state.fuel.reading();
    state.publisher.update(|s| {
        let flow = s.fuel_flow_ml_s;
        s.apply_fuel(&reading, flow);
    });
    info!("Fuel reset from operator: {:.1}ml", reading.remaining_ml);
    Ok(Json(reading))
}

/// Mount a tire set; later distance counts against it
pub async fn select_tire(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectTireRequest>,
) -> Result<Json<OdometerReading>, ApiError> {
    let reading = state.odometer.select_tire(&request.tire)?;
    save_distance(&state.odometer, &state.distance_store, today()).await;
    state.publisher.update(|s| s.apply_distance(&reading));
    Ok(Json(reading))
}
