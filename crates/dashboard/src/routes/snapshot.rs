//! Snapshot, tire mileage and health routes

use axum::{extract::State, Json};
use lap_timer::TimerPhase;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use vehicle_state::VehicleSnapshot;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub packets_decoded: u64,
    pub timer_phase: TimerPhase,
    pub gps_quality: u8,
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let snapshot = state.publisher.latest();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        packets_decoded: snapshot.packets,
        timer_phase: snapshot.timer_phase,
        gps_quality: snapshot.gps_quality,
    })
}

/// Current vehicle snapshot
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<VehicleSnapshot> {
    Json(state.publisher.latest())
}

/// Distance run on each known tire set (km)
pub async fn get_tires(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, f64>> {
    Json(state.odometer.tire_mileage())
}
