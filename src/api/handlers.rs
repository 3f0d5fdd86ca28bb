use axum::{
    extract::{ConnectInfo, State},
    http::{header::HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::client_ip::resolve_client_ip;
use super::middleware::RequestDeadline;
use crate::config::ClientIpConfig;
use crate::models::{CountResponse, Tenant};
use crate::visit::{VisitAggregator, VisitError};

pub struct AppState {
    pub aggregator: Arc<VisitAggregator>,
    pub client_ip: ClientIpConfig,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Record a visit from the caller and return the aggregated view of it
pub async fn get_count(
    State(state): State<Arc<AppState>>,
    Extension(RequestDeadline(deadline)): Extension<RequestDeadline>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<CountResponse>, VisitError> {
    let client = resolve_client_ip(&headers, addr.ip(), &state.client_ip).to_string();
    let tenant = Tenant::from_headers(&headers);

    let response = state
        .aggregator
        .record_visit(&client, tenant.as_ref(), deadline)
        .await?;

    Ok(Json(response))
}

// The failing step is logged by the aggregator; callers get a generic error
impl IntoResponse for VisitError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}
