//! HTTP route handlers

pub mod commands;
pub mod gps;
pub mod snapshot;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use course_registry::CourseError;
use fuel_integrator::FuelError;
use lap_timer::{OdometerError, SessionError};
use serde::Serialize;

/// Error body returned by every handler
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler failures mapped onto HTTP status codes
#[derive(Debug)]
pub enum ApiError {
    Session(SessionError),
    Fuel(FuelError),
    Odometer(OdometerError),
    /// Backing task not running
    Unavailable(&'static str),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError::Session(e)
    }
}

impl From<FuelError> for ApiError {
    fn from(e: FuelError) -> Self {
        ApiError::Fuel(e)
    }
}

impl From<OdometerError> for ApiError {
    fn from(e: OdometerError) -> Self {
        ApiError::Odometer(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Session(
                e @ (SessionError::NoFix
                | SessionError::NoHeading
                | SessionError::Course(CourseError::NoStartLine)),
            ) => (StatusCode::CONFLICT, e.to_string()),
            ApiError::Session(e @ SessionError::InvalidSector(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Session(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::Fuel(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Odometer(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Unavailable(task) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} task is not running", task),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
