use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::time::Duration;
use tokio::time::Instant;

/// Point in time by which every backend step of the request must have finished.
#[derive(Copy, Clone, Debug)]
pub struct RequestDeadline(pub Instant);

pub async fn stamp_request_deadline(
    State(timeout): State<Duration>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request
        .extensions_mut()
        .insert(RequestDeadline(Instant::now() + timeout));
    next.run(request).await
}
