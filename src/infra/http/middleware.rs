use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::{error::ErrorReport, sessions::Viewer};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_REQUEST_ID_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag the request with an id, reusing a sane `X-Request-Id` from the client.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| is_usable_request_id(value))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(RequestContext { request_id });
    response
}

fn is_usable_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// Log 4xx responses as warnings and 5xx as errors, with any attached [`ErrorReport`].
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let viewer = request
        .extensions()
        .get::<Viewer>()
        .map(|viewer| viewer.username.clone())
        .unwrap_or_default();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, chain) = report
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let detail = chain.first().map(String::as_str).unwrap_or("-");
    let elapsed_ms = started.elapsed().as_millis();

    if status.is_server_error() {
        error!(
            target = "yatube::http::response",
            status = status.as_u16(),
            %method,
            path = uri.path(),
            elapsed_ms,
            source,
            detail,
            ?chain,
            request_id = %request_id,
            viewer = %viewer,
            "request failed",
        );
    } else {
        warn!(
            target = "yatube::http::response",
            status = status.as_u16(),
            %method,
            path = uri.path(),
            elapsed_ms,
            source,
            detail,
            request_id = %request_id,
            viewer = %viewer,
            "request rejected",
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_from_clients_are_sanitised() {
        assert!(is_usable_request_id("abc-123_DEF"));
        assert!(!is_usable_request_id(""));
        assert!(!is_usable_request_id("has space"));
        assert!(!is_usable_request_id(&"a".repeat(MAX_REQUEST_ID_LEN + 1)));
    }
}
