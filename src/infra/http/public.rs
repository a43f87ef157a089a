use std::io::ErrorKind;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        feed::FeedError,
        pagination::parse_page_number,
        sessions::Viewer,
    },
    infra::uploads::UploadStorageError,
    presentation::views::{
        FeedContext, FollowTemplate, GroupContext, GroupListTemplate, IndexTemplate,
        LayoutContext, PostDetailContext, PostDetailTemplate, ProfileContext, ProfileTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{CurrentViewer, HttpState, RequireViewer, db_health_response};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn number(&self) -> u32 {
        parse_page_number(self.page.as_deref())
    }
}

pub(super) async fn index(
    State(state): State<HttpState>,
    current: CurrentViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index(query.number()).await {
        Ok(page) => {
            let content = FeedContext::new(&page, "/");
            let view = LayoutContext::new(current.viewer(), "Latest updates", content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, current.viewer()),
    }
}

pub(super) async fn group_posts(
    State(state): State<HttpState>,
    current: CurrentViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group(&slug, query.number()).await {
        Ok(feed) => {
            let title = feed.group.to_string();
            let view = LayoutContext::new(current.viewer(), title, GroupContext::from(&feed));
            render_template_response(GroupListTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, current.viewer()),
    }
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    current: CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = current.viewer();
    let viewer_id = viewer.map(|viewer| viewer.user_id);

    match state.feed.profile(&username, viewer_id, query.number()).await {
        Ok(profile) => {
            let title = format!("Profile of {}", profile.author.username);
            let view = LayoutContext::new(viewer, title, ProfileContext::new(&profile, viewer));
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer),
    }
}

pub(super) async fn follow_index(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.follow_index(viewer.user_id, query.number()).await {
        Ok(page) => {
            let content = FeedContext::new(&page, "/follow/");
            let view = LayoutContext::new(Some(&viewer), "Following", content);
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, Some(&viewer)),
    }
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    current: CurrentViewer,
    Path(post_id): Path<i64>,
) -> Response {
    let viewer = current.viewer();
    match state.feed.post_detail(post_id).await {
        Ok(detail) => {
            let title = format!("Post {}", detail.post);
            let view = LayoutContext::new(viewer, title, PostDetailContext::new(&detail, viewer));
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer),
    }
}

pub(super) async fn serve_media(
    State(state): State<HttpState>,
    current: CurrentViewer,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => render_not_found_response(current.viewer()),
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            render_not_found_response(current.viewer())
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored image"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored image",
                &err,
            )
            .into_response()
        }
    }
}

pub(super) async fn db_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}

pub(super) async fn not_found(current: CurrentViewer) -> Response {
    render_not_found_response(current.viewer())
}

/// Unknown groups, authors and posts render the 404 page; storage failures do not.
pub(super) fn feed_error_to_response(err: FeedError, viewer: Option<&Viewer>) -> Response {
    if err.is_not_found() {
        let mut response = render_not_found_response(viewer);
        ErrorReport::from_error(
            "infra::http::public::feed_error_to_response",
            StatusCode::NOT_FOUND,
            &err,
        )
        .attach(&mut response);
        return response;
    }
    HttpError::from(err).into_response()
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}
