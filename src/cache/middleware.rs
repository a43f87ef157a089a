//! Response cache middleware.
//!
//! Serves repeated GET requests from the `ResponseStore` until the entry's
//! TTL runs out. Writes never invalidate cached pages.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument, warn};

use crate::application::sessions::Viewer;

use super::{
    CacheConfig,
    keys::ResponseKey,
    store::{CachedResponse, Lookup, ResponseStore},
};

const MAX_CACHED_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ResponseStore>,
}

impl CacheState {
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(ResponseStore::new(&config));
        Self { config, store }
    }

    /// Forget every cached page.
    pub fn clear(&self) {
        self.store.clear();
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let viewer = request.extensions().get::<Viewer>().map(|viewer| viewer.user_id);
    let key = ResponseKey::new(
        request.uri().path(),
        request.uri().query().unwrap_or(""),
        viewer,
    );

    match cache.store.lookup(&key) {
        Lookup::Hit(cached) => {
            debug!(cache = "response", outcome = "hit", "serving cached response");
            return build_response(cached);
        }
        Lookup::Expired => {
            debug!(cache = "response", outcome = "expired", "rendering fresh response")
        }
        Lookup::Miss => debug!(cache = "response", outcome = "miss", "rendering fresh response"),
    }

    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "response", error = %err, "failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
        extensions: parts.extensions.clone(),
    };
    cache.store.set(key, cached);

    Response::from_parts(parts, Body::from(bytes))
}

/// Only plain `200 OK` pages that do not touch cookies are shared.
pub fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(header::SET_COOKIE)
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    match builder.body(Body::from(cached.body)) {
        Ok(mut response) => {
            *response.extensions_mut() = cached.extensions;
            response
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
