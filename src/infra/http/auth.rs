//! Session resolution and the token login pages.

use std::convert::Infallible;

use axum::{
    Form,
    body::Body,
    extract::{FromRequestParts, Query, State},
    http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    application::{
        error::HttpError,
        sessions::{SessionError, Viewer},
    },
    presentation::views::{LayoutContext, LoginContext, LoginTemplate, render_template_response},
};

use super::{HttpState, redirect::Found};

pub const SESSION_COOKIE: &str = "yatube_session";
const INVALID_TOKEN_MESSAGE: &str = "The session token is invalid, expired or revoked.";

/// Attach the [`Viewer`] behind the session cookie or bearer token, if any.
pub async fn resolve_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        match state.sessions.authenticate(&token).await {
            Ok(viewer) => {
                request.extensions_mut().insert(viewer);
            }
            Err(SessionError::Repo(err)) => {
                warn!(target = "yatube::http::auth", error = %err, "session lookup failed");
            }
            Err(err) => {
                debug!(target = "yatube::http::auth", error = %err, "ignoring session token");
            }
        }
    }

    next.run(request).await
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    })
}

/// The viewer of the current request, when logged in.
pub struct CurrentViewer(pub Option<Viewer>);

impl CurrentViewer {
    pub fn viewer(&self) -> Option<&Viewer> {
        self.0.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentViewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Viewer>().cloned()))
    }
}

/// A logged-in viewer; anonymous requests are sent to the login page.
pub struct RequireViewer(pub Viewer);

impl FromRequestParts<HttpState> for RequireViewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(viewer) => Ok(Self(viewer.clone())),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str())
                    .unwrap_or("/");
                Err(login_redirect(&state.login_path, next).into_response())
            }
        }
    }
}

/// `<login_path>?next=<path>`, keeping slashes readable.
pub fn login_redirect(login_path: &str, next: &str) -> Found {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    let encoded = encoded.replace("%2F", "/");
    Found::to(&format!("{login_path}?next={encoded}"))
}

/// Only same-site relative paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    token: String,
    next: Option<String>,
}

pub(super) async fn login_form(
    current: CurrentViewer,
    Query(query): Query<LoginQuery>,
) -> Response {
    render_login(current.viewer(), safe_next(query.next.as_deref()), None)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    match state.sessions.authenticate(&form.token).await {
        Ok(viewer) => {
            debug!(target = "yatube::http::auth", user_id = viewer.user_id, "viewer logged in");
            let cookie = Cookie::build((SESSION_COOKIE, form.token.trim().to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (jar.add(cookie), Found::to(&next)).into_response()
        }
        Err(SessionError::Repo(err)) => {
            HttpError::from_repo("infra::http::auth::login_submit", err).into_response()
        }
        Err(_) => render_login(None, &next, Some(INVALID_TOKEN_MESSAGE)),
    }
}

pub(super) async fn logout(
    State(state): State<HttpState>,
    current: CurrentViewer,
    jar: CookieJar,
) -> Response {
    if let Some(viewer) = current.viewer()
        && let Err(err) = state.sessions.revoke(viewer.session_id).await
    {
        warn!(target = "yatube::http::auth", error = %err, "failed to revoke session");
    }

    let expired = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build();
    (jar.add(expired), Found::to("/")).into_response()
}

fn render_login(viewer: Option<&Viewer>, next: &str, error: Option<&str>) -> Response {
    let content = LoginContext {
        next: next.to_string(),
        has_error: error.is_some(),
        error: error.unwrap_or_default().to_string(),
    };
    let view = LayoutContext::new(viewer, "Log in", content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header};

    use super::*;

    #[test]
    fn safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(Some("/create/")), "/create/");
        assert_eq!(safe_next(Some("//evil.example/")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(Some("/\\evil")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn login_redirect_keeps_path_slashes() {
        let response = login_redirect("/auth/login/", "/posts/1/edit/").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION),
            Some(&HeaderValue::from_static("/auth/login/?next=/posts/1/edit/"))
        );
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("yatube_session=from-cookie"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }
}
