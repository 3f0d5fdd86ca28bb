use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ClientIpConfig;
use crate::visit::VisitAggregator;

use super::handlers::{get_count, health_check, AppState};
use super::middleware::stamp_request_deadline;

pub fn create_router(
    aggregator: Arc<VisitAggregator>,
    client_ip: ClientIpConfig,
    request_timeout: Duration,
) -> Router {
    let state = Arc::new(AppState {
        aggregator,
        client_ip,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/count", get(get_count))
        .layer(middleware::from_fn_with_state(
            request_timeout,
            stamp_request_deadline,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
