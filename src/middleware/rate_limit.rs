use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};

use crate::error::AppError;

/// Type alias for the global governor layer (IP-based rate limiting)
pub type GlobalGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Create a GovernorLayer for rate limiting per IP address
/// - `per_millisecond`: one token is replenished every this many milliseconds
/// - `burst`: how many requests a single IP may make at once
///
/// Needs the server to be started with `into_make_service_with_connect_info`.
pub fn create_global_governor(per_millisecond: u64, burst: u32) -> Option<GlobalGovernorLayer> {
    let config = GovernorConfigBuilder::default()
        .per_millisecond(per_millisecond)
        .burst_size(burst)
        .finish()?;

    Some(GovernorLayer::new(Arc::new(config)).error_handler(rate_limit_error_handler))
}

/// Render governor rejections in the API's JSON error format, keeping its
/// `retry-after` and `x-ratelimit-*` headers.
pub fn rate_limit_error_handler(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut response = AppError::TooManyRequests(format!(
                "Too many requests, retry in {}s",
                wait_time
            ))
            .into_response();
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("Unable to identify client for rate limiting".to_string())
                .into_response()
        }
        other => AppError::Internal(format!("Rate limiter failure: {:?}", other)).into_response(),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Throttled,
    Failed,
    Rejected,
}

/// How a finished request is reported; `None` for successes.
fn outcome(status: StatusCode) -> Option<Outcome> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Some(Outcome::Throttled)
    } else if status.is_server_error() {
        Some(Outcome::Failed)
    } else if status.is_client_error() {
        Some(Outcome::Rejected)
    } else {
        None
    }
}

/// Log every API call that did not succeed, tagged with the caller's address.
/// Must wrap the governor layer so throttled calls are seen too.
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    tracing::debug!(client_ip = %addr.ip(), %method, %path, "Incoming request");

    let response = next.run(request).await;
    let status = response.status();

    match outcome(status) {
        Some(Outcome::Throttled) => {
            tracing::warn!(client_ip = %addr.ip(), %method, %path, "Rate limited");
        }
        Some(Outcome::Failed) => {
            tracing::error!(client_ip = %addr.ip(), %method, %path, %status, "Request failed");
        }
        Some(Outcome::Rejected) => {
            tracing::info!(client_ip = %addr.ip(), %method, %path, %status, "Request rejected");
        }
        None => {}
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_by_status() {
        assert_eq!(outcome(StatusCode::TOO_MANY_REQUESTS), Some(Outcome::Throttled));
        assert_eq!(outcome(StatusCode::INTERNAL_SERVER_ERROR), Some(Outcome::Failed));
        assert_eq!(outcome(StatusCode::NOT_FOUND), Some(Outcome::Rejected));
        assert_eq!(outcome(StatusCode::CREATED), None);
    }

    #[test]
    fn test_throttled_requests_get_json_error() {
        let response = rate_limit_error_handler(GovernorError::TooManyRequests {
            wait_time: 3,
            headers: None,
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }
}
