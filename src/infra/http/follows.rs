use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{
    application::{error::HttpError, follows::FollowError, sessions::Viewer},
    presentation::views::{profile_path, render_not_found_response},
};

use super::{HttpState, RequireViewer, redirect::Found};

pub(super) async fn profile_follow(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.follow(viewer.user_id, &username).await;
    follow_outcome("infra::http::follows::profile_follow", result, &viewer, &username)
}

pub(super) async fn profile_unfollow(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.unfollow(viewer.user_id, &username).await;
    follow_outcome(
        "infra::http::follows::profile_unfollow",
        result,
        &viewer,
        &username,
    )
}

/// Every outcome except an unknown author or a storage failure lands on the profile.
fn follow_outcome(
    source: &'static str,
    result: Result<bool, FollowError>,
    viewer: &Viewer,
    username: &str,
) -> Response {
    match result {
        Ok(_) => Found::to(&profile_path(username)).into_response(),
        Err(FollowError::Domain(err)) => {
            debug!(
                target = "yatube::http::follows",
                user_id = viewer.user_id,
                error = %err,
                "follow rejected"
            );
            Found::to(&profile_path(username)).into_response()
        }
        Err(FollowError::UnknownAuthor(_)) => render_not_found_response(Some(viewer)),
        Err(FollowError::Repo(err)) => HttpError::from_repo(source, err).into_response(),
    }
}
