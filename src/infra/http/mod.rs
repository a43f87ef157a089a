mod auth;
mod follows;
mod forms;
mod middleware;
mod posts;
mod public;
mod redirect;

pub use auth::{CurrentViewer, RequireViewer, SESSION_COOKIE, login_redirect, safe_next};
pub use middleware::REQUEST_ID_HEADER;
pub use redirect::Found;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    application::{
        comments::CommentService,
        error::ErrorReport,
        feed::FeedService,
        follows::FollowService,
        groups::GroupService,
        pagination::DEFAULT_PAGE_SIZE,
        posts::PostService,
        repos::{HealthRepo, RepoError, Repositories},
        sessions::SessionService,
    },
    cache::{CacheConfig, CacheState, response_cache_layer},
    config::Settings,
    infra::uploads::UploadStorage,
};

use middleware::{log_responses, set_request_context};

const DEFAULT_UPLOAD_LIMIT_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_LOGIN_PATH: &str = "/auth/login/";

/// Knobs the router needs beyond the repositories themselves.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub page_size: u32,
    pub login_path: String,
    pub upload_limit_bytes: u64,
    pub session_ttl: Option<std::time::Duration>,
    pub cache: CacheConfig,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
            session_ttl: None,
            cache: CacheConfig::default(),
        }
    }
}

impl From<&Settings> for RouterOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            page_size: settings.feed.page_size.get(),
            login_path: settings.auth.login_path.clone(),
            upload_limit_bytes: settings.uploads.max_request_bytes.get(),
            session_ttl: settings.auth.session_ttl,
            cache: CacheConfig::from(&settings.cache),
        }
    }
}

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub follows: Arc<FollowService>,
    pub groups: Arc<GroupService>,
    pub sessions: Arc<SessionService>,
    pub health: Arc<dyn HealthRepo>,
    pub upload_storage: Arc<UploadStorage>,
    pub upload_limit_bytes: u64,
    pub login_path: Arc<str>,
    pub cache: Option<CacheState>,
}

impl HttpState {
    /// Wire every service onto one storage backend.
    pub fn new<R: Repositories>(
        repositories: Arc<R>,
        upload_storage: Arc<UploadStorage>,
        options: &RouterOptions,
    ) -> Self {
        let session_ttl = options
            .session_ttl
            .and_then(|ttl| time::Duration::try_from(ttl).ok());

        let feed = FeedService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
        )
        .with_page_size(options.page_size);
        let posts = PostService::new(
            repositories.clone(),
            repositories.clone(),
            repositories.clone(),
        )
        .with_images(upload_storage.clone());
        let comments = CommentService::new(repositories.clone(), repositories.clone());
        let follows = FollowService::new(repositories.clone(), repositories.clone());
        let groups = GroupService::new(repositories.clone());
        let sessions =
            SessionService::new(repositories.clone(), repositories.clone()).with_ttl(session_ttl);

        let cache = options
            .cache
            .enabled
            .then(|| CacheState::new(options.cache.clone()));

        Self {
            feed: Arc::new(feed),
            posts: Arc::new(posts),
            comments: Arc::new(comments),
            follows: Arc::new(follows),
            groups: Arc::new(groups),
            sessions: Arc::new(sessions),
            health: repositories,
            upload_storage,
            upload_limit_bytes: options.upload_limit_bytes,
            login_path: Arc::from(options.login_path.as_str()),
            cache,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    // Only the home feed goes through the response cache.
    let index = Router::new().route("/", get(public::index));
    let index = match state.cache.clone() {
        Some(cache) => index.layer(from_fn_with_state(cache, response_cache_layer)),
        None => index,
    };

    let upload_body_limit = usize::try_from(state.upload_limit_bytes).unwrap_or(usize::MAX);

    Router::new()
        .merge(index)
        .route("/group/{slug}/", get(public::group_posts))
        .route("/profile/{username}/", get(public::profile))
        .route("/profile/{username}/follow/", get(follows::profile_follow))
        .route(
            "/profile/{username}/unfollow/",
            get(follows::profile_unfollow),
        )
        .route("/follow/", get(public::follow_index))
        .route("/posts/{post_id}/", get(public::post_detail))
        .route(
            "/create/",
            get(posts::create_form)
                .post(posts::create_submit)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(posts::edit_form)
                .post(posts::edit_submit)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/posts/{post_id}/delete/", post(posts::delete_post))
        .route("/posts/{post_id}/comment/", post(posts::add_comment))
        .route(
            "/posts/{post_id}/comments/{comment_id}/delete/",
            post(posts::delete_comment),
        )
        .route(
            "/auth/login/",
            get(auth::login_form).post(auth::login_submit),
        )
        .route("/auth/logout/", get(auth::logout))
        .route("/media/{*path}", get(public::serve_media))
        .route("/_health/db", get(public::db_health))
        .fallback(public::not_found)
        .layer(from_fn(log_responses))
        .layer(from_fn_with_state(state.clone(), auth::resolve_viewer))
        .layer(from_fn(set_request_context))
        .with_state(state)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
