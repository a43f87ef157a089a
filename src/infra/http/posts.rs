//! Post authoring, editing and comment handlers. All of them need a viewer.

use axum::{
    Form,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    application::{
        comments::CommentError,
        error::HttpError,
        groups::GroupError,
        posts::{PostError, PostInput},
        sessions::Viewer,
    },
    domain::{
        entities::{GroupRecord, PostRecord},
        posts::normalize_post_text,
        validation::FieldErrors,
    },
    presentation::views::{
        LayoutContext, PostFormContext, PostFormTemplate, post_path, profile_path,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState, RequireViewer,
    forms::{PostForm, read_post_form},
    redirect::Found,
};

const SOURCE_BASE: &str = "infra::http::posts";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentForm {
    text: String,
}

pub(super) async fn create_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
) -> Response {
    let groups = match load_groups(&state).await {
        Ok(groups) => groups,
        Err(err) => return err.into_response(),
    };
    render_form(&viewer, PostFormContext::create(&groups))
}

pub(super) async fn create_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    request: Request<Body>,
) -> Response {
    let mut form =
        match read_post_form(&state.upload_storage, state.upload_limit_bytes, request).await {
            Ok(form) => form,
            Err(err) => return err.into_response(),
        };
    let input = form.input();

    let result = if form.errors.is_empty() {
        state
            .posts
            .create(viewer.user_id, input.clone(), form.image.clone())
            .await
    } else {
        Err(PostError::Invalid(FieldErrors::new()))
    };

    match result {
        Ok(_) => Found::to(&profile_path(&viewer.username)).into_response(),
        Err(PostError::Invalid(errors)) => {
            form.discard_image(&state.upload_storage).await;
            let errors = merge_errors(&form, &input, errors);
            let groups = match load_groups(&state).await {
                Ok(groups) => groups,
                Err(err) => return err.into_response(),
            };
            let context = PostFormContext::create(&groups).with_submission(
                &form.text,
                input.group_id,
                &groups,
                &errors,
            );
            render_form(&viewer, context)
        }
        Err(err) => {
            form.discard_image(&state.upload_storage).await;
            post_error_to_response("infra::http::posts::create_submit", err, &viewer)
        }
    }
}

pub(super) async fn edit_form(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(post_id): Path<i64>,
) -> Response {
    let post = match authored_post(&state, &viewer, post_id).await {
        Ok(post) => post,
        Err(response) => return response,
    };
    let groups = match load_groups(&state).await {
        Ok(groups) => groups,
        Err(err) => return err.into_response(),
    };
    render_form(&viewer, PostFormContext::edit(&post, &groups))
}

pub(super) async fn edit_submit(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(post_id): Path<i64>,
    request: Request<Body>,
) -> Response {
    let post = match authored_post(&state, &viewer, post_id).await {
        Ok(post) => post,
        Err(response) => return response,
    };

    let mut form =
        match read_post_form(&state.upload_storage, state.upload_limit_bytes, request).await {
            Ok(form) => form,
            Err(err) => return err.into_response(),
        };
    let input = form.input();

    let result = if form.errors.is_empty() {
        state
            .posts
            .edit(viewer.user_id, post_id, input.clone(), form.image_change())
            .await
    } else {
        Err(PostError::Invalid(FieldErrors::new()))
    };

    match result {
        Ok(_) => Found::to(&post_path(post_id)).into_response(),
        Err(PostError::Invalid(errors)) => {
            form.discard_image(&state.upload_storage).await;
            let errors = merge_errors(&form, &input, errors);
            let groups = match load_groups(&state).await {
                Ok(groups) => groups,
                Err(err) => return err.into_response(),
            };
            let context = PostFormContext::edit(&post, &groups).with_submission(
                &form.text,
                input.group_id,
                &groups,
                &errors,
            );
            render_form(&viewer, context)
        }
        Err(err) => {
            form.discard_image(&state.upload_storage).await;
            post_error_to_response("infra::http::posts::edit_submit", err, &viewer)
        }
    }
}

pub(super) async fn delete_post(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(post_id): Path<i64>,
) -> Response {
    match state.posts.delete(viewer.user_id, post_id).await {
        Ok(_) => Found::to(&profile_path(&viewer.username)).into_response(),
        Err(err) => post_error_to_response("infra::http::posts::delete_post", err, &viewer),
    }
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Response {
    match state
        .comments
        .add(post_id, viewer.user_id, &form.text)
        .await
    {
        Ok(_) => Found::to(&post_path(post_id)).into_response(),
        // An empty comment is dropped and the reader lands back on the post.
        Err(CommentError::Invalid(errors)) => {
            debug!(target = SOURCE_BASE, post_id, %errors, "comment rejected");
            Found::to(&post_path(post_id)).into_response()
        }
        Err(err) => comment_error_to_response("infra::http::posts::add_comment", err, &viewer),
    }
}

pub(super) async fn delete_comment(
    State(state): State<HttpState>,
    RequireViewer(viewer): RequireViewer,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Response {
    match state.comments.delete(viewer.user_id, comment_id).await {
        Ok(comment) => Found::to(&post_path(comment.post_id)).into_response(),
        Err(CommentError::NotAuthor { .. }) => Found::to(&post_path(post_id)).into_response(),
        Err(err) => {
            comment_error_to_response("infra::http::posts::delete_comment", err, &viewer)
        }
    }
}

/// The post when `viewer` wrote it; otherwise the response to send instead.
async fn authored_post(
    state: &HttpState,
    viewer: &Viewer,
    post_id: i64,
) -> Result<PostRecord, Response> {
    match state.posts.find(post_id).await {
        Ok(post) if post.is_authored_by(viewer.user_id) => Ok(post),
        Ok(_) => Err(Found::to(&post_path(post_id)).into_response()),
        Err(err) => Err(post_error_to_response(
            "infra::http::posts::authored_post",
            err,
            viewer,
        )),
    }
}

async fn load_groups(state: &HttpState) -> Result<Vec<GroupRecord>, HttpError> {
    state.groups.list().await.map_err(|err| match err {
        GroupError::Repo(repo) => HttpError::from_repo("infra::http::posts::load_groups", repo),
        other => HttpError::internal("infra::http::posts::load_groups", &other),
    })
}

/// Binding errors come first; text is re-checked so both fields report together.
fn merge_errors(form: &PostForm, input: &PostInput, service: FieldErrors) -> FieldErrors {
    if form.errors.is_empty() {
        return service;
    }
    let mut errors = form.errors.clone();
    if errors.get("text").is_empty()
        && let Err(err) = normalize_post_text(&input.text)
    {
        errors.record::<String>(Err(err));
    }
    errors
}

fn render_form(viewer: &Viewer, context: PostFormContext) -> Response {
    let title = if context.is_edit { "Edit post" } else { "New post" };
    let view = LayoutContext::new(Some(viewer), title, context);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn post_error_to_response(source: &'static str, err: PostError, viewer: &Viewer) -> Response {
    match err {
        PostError::NotFound => render_not_found_response(Some(viewer)),
        PostError::NotAuthor { post_id, .. } => Found::to(&post_path(post_id)).into_response(),
        PostError::Repo(repo) => HttpError::from_repo(source, repo).into_response(),
        PostError::Invalid(errors) => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid post", errors.to_string())
                .into_response()
        }
    }
}

fn comment_error_to_response(
    source: &'static str,
    err: CommentError,
    viewer: &Viewer,
) -> Response {
    match err {
        CommentError::PostNotFound | CommentError::NotFound => {
            render_not_found_response(Some(viewer))
        }
        CommentError::Repo(repo) => HttpError::from_repo(source, repo).into_response(),
        other => HttpError::new(
            source,
            StatusCode::BAD_REQUEST,
            "Invalid comment",
            other.to_string(),
        )
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{application::posts::UNKNOWN_GROUP_MESSAGE, domain::validation::REQUIRED_MESSAGE};

    use super::*;

    #[test]
    fn binding_errors_are_reported_with_missing_text() {
        let mut form = PostForm {
            group: "not-a-number".to_string(),
            ..PostForm::default()
        };
        let input = form.input();
        let errors = merge_errors(&form, &input, FieldErrors::new());

        assert_eq!(errors.first("group"), Some(UNKNOWN_GROUP_MESSAGE));
        assert_eq!(errors.first("text"), Some(REQUIRED_MESSAGE));
    }

    #[test]
    fn service_errors_pass_through_when_binding_succeeded() {
        let form = PostForm::default();
        let service = FieldErrors::single("text", REQUIRED_MESSAGE);
        let errors = merge_errors(&form, &PostInput::default(), service.clone());
        assert_eq!(errors, service);
    }
}
