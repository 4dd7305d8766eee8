//! HTTP Handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use monitor_core::{MonitorError, PriceObservation};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub assets: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub symbol: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl From<PriceObservation> for PriceResponse {
    fn from(obs: PriceObservation) -> Self {
        Self {
            symbol: obs.symbol,
            price: obs.price,
            variation: obs.variation,
            observed_at: obs.observed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Maps monitor errors onto HTTP statuses
#[derive(Debug)]
pub struct ApiError(MonitorError);

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MonitorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.0.user_message(),
            code: self.0.code().into(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        assets: state.assets.as_ref().clone(),
    })
}

/// Latest stored price for `?symbol=`
pub async fn get_prices(
    State(state): State<AppState>,
    Query(params): Query<PriceQuery>,
) -> Result<Json<PriceResponse>, ApiError> {
    let observation = state.query.latest(params.symbol.as_deref()).await?;
    Ok(Json(observation.into()))
}
