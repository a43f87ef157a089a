#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, Response, StatusCode, header},
};
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use yatube::application::groups::GroupInput;
use yatube::application::posts::PostInput;
use yatube::application::users::UserService;
use yatube::domain::entities::{GroupRecord, PostRecord, UserRecord};
use yatube::infra::http::{HttpState, RouterOptions, build_router};
use yatube::infra::memory::MemoryRepositories;
use yatube::infra::uploads::UploadStorage;
use yatube::presentation::views::RenderedTemplate;

const BODY_LIMIT: usize = 8 * 1024 * 1024;

pub struct TestApp {
    pub repos: Arc<MemoryRepositories>,
    pub state: HttpState,
    pub router: Router,
    pub media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    pub fn with_options(options: RouterOptions) -> Self {
        let media = TempDir::new().expect("temp media dir");
        let storage =
            Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("upload storage"));
        let repos = Arc::new(MemoryRepositories::new());
        let state = HttpState::new(repos.clone(), storage, &options);
        let router = build_router(state.clone());
        Self {
            repos,
            state,
            router,
            media,
        }
    }

    pub async fn user(&self, username: &str) -> UserRecord {
        UserService::new(self.repos.clone())
            .register(username)
            .await
            .expect("user should register")
    }

    /// A user plus a bearer token for them.
    pub async fn login(&self, username: &str) -> (UserRecord, String) {
        let user = self.user(username).await;
        let issued = self
            .state
            .sessions
            .issue(username)
            .await
            .expect("session should issue");
        (user, issued.token)
    }

    pub async fn group(&self, title: &str, slug: &str) -> GroupRecord {
        self.state
            .groups
            .create(GroupInput {
                title: title.to_string(),
                slug: Some(slug.to_string()),
                description: format!("About {title}"),
            })
            .await
            .expect("group should create")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group: Option<i64>) -> PostRecord {
        self.state
            .posts
            .create(
                author.id,
                PostInput {
                    text: text.to_string(),
                    group_id: group,
                },
                None,
            )
            .await
            .expect("post should create")
    }

    /// `count` posts spaced a minute apart, oldest first.
    pub async fn posts(
        &self,
        author: &UserRecord,
        count: usize,
        group: Option<i64>,
    ) -> Vec<PostRecord> {
        let base = OffsetDateTime::now_utc() - Duration::hours(1);
        let mut posts = Vec::with_capacity(count);
        for index in 0..count {
            let post = self.post(author, &format!("Post number {index}"), group).await;
            self.repos
                .set_post_created_at(post.id, base + Duration::minutes(index as i64))
                .await
                .expect("created_at should update");
            posts.push(post);
        }
        posts
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let request = authorized(Request::builder().method(Method::GET).uri(uri), token)
            .body(Body::empty())
            .expect("request should build");
        self.send(request).await
    }

    pub async fn post_form(&self, uri: &str, token: Option<&str>, form: &str) -> Response<Body> {
        let request = authorized(Request::builder().method(Method::POST).uri(uri), token)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .expect("request should build");
        self.send(request).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Multipart,
    ) -> Response<Body> {
        let request = authorized(Request::builder().method(Method::POST).uri(uri), token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", Multipart::BOUNDARY),
            )
            .body(Body::from(body.finish()))
            .expect("request should build");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }
}

fn authorized(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// Hand-assembled `multipart/form-data` body.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub const BOUNDARY: &'static str = "yatube-test-boundary";

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());
        self.body
    }
}

/// A 1x1 transparent GIF.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04,
    0x01, 0x0a, 0x00, 0x01, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02,
    0x02, 0x4c, 0x01, 0x00, 0x3b,
];

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .expect("body should read");
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

pub fn template(response: &Response<Body>) -> Option<&'static str> {
    response
        .extensions()
        .get::<RenderedTemplate>()
        .map(|rendered| rendered.0)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(
        response.status(),
        StatusCode::FOUND,
        "expected 302 redirect to {to}"
    );
    assert_eq!(location(response), to);
}

pub fn count_posts(html: &str) -> usize {
    html.matches("<article class=\"post\">").count()
}

