use crate::application::{
    error::{ErrorReport, HttpError},
    feed::{GroupFeed, PostDetail, ProfileFeed},
    pagination::Page,
    sessions::Viewer,
};
use crate::domain::{
    entities::{CommentRecord, GroupRecord, PostRecord},
    validation::{FieldErrors, NON_FIELD},
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year] [hour]:[minute]");
const SITE_TITLE: &str = "Yatube";

/// Name of the template a response was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedTemplate(pub &'static str);

/// Template path, recorded on responses as [`RenderedTemplate`].
pub trait NamedTemplate: Template {
    const NAME: &'static str;
}

macro_rules! named_template {
    ($ty:ty, $path:literal) => {
        impl NamedTemplate for $ty {
            const NAME: &'static str = $path;
        }
    };
}

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: NamedTemplate>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => {
            let mut response = (status, html).into_response();
            response
                .extensions_mut()
                .insert(RenderedTemplate(T::NAME));
            response
        }
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<&Viewer>) -> Response {
    let view = LayoutContext::new(viewer, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(DATE_FORMAT).unwrap_or_default()
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn post_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

pub fn group_path(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub profile_href: String,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: &'static str,
    pub title: String,
    pub is_authenticated: bool,
    pub viewer: ViewerView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(viewer: Option<&Viewer>, title: impl Into<String>, content: T) -> Self {
        let viewer_view = viewer
            .map(|viewer| ViewerView {
                username: viewer.username.clone(),
                profile_href: profile_path(&viewer.username),
            })
            .unwrap_or_else(|| ViewerView {
                username: String::new(),
                profile_href: String::new(),
            });
        Self {
            site_title: SITE_TITLE,
            title: title.into(),
            is_authenticated: viewer.is_some(),
            viewer: viewer_view,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub href: String,
    pub text: String,
    pub author: String,
    pub author_href: String,
    pub published: String,
    pub has_group: bool,
    pub group_title: String,
    pub group_href: String,
    pub has_image: bool,
    pub image_url: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        let (group_title, group_href) = match &post.group {
            Some(group) => (group.title.clone(), group_path(&group.slug)),
            None => (String::new(), String::new()),
        };
        let image_url = post.image.as_deref().map(media_url).unwrap_or_default();
        Self {
            id: post.id,
            href: post_path(post.id),
            text: post.text.clone(),
            author: post.author_username.clone(),
            author_href: profile_path(&post.author_username),
            published: format_timestamp(post.created_at),
            has_group: post.group.is_some(),
            group_title,
            group_href,
            has_image: post.image.is_some(),
            image_url,
        }
    }
}

#[derive(Clone)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Pagination controls for a feed rendered at `base_path`.
#[derive(Clone)]
pub struct PaginatorView {
    pub number: u32,
    pub num_pages: u32,
    pub show: bool,
    pub has_previous: bool,
    pub previous_href: String,
    pub has_next: bool,
    pub next_href: String,
    pub first_href: String,
    pub last_href: String,
    pub pages: Vec<PageLink>,
}

impl PaginatorView {
    pub fn new<T>(page: &Page<T>, base_path: &str) -> Self {
        let href = |number: u32| format!("{base_path}?page={number}");
        Self {
            number: page.number,
            num_pages: page.num_pages,
            show: page.num_pages > 1,
            has_previous: page.has_previous(),
            previous_href: page.previous_number().map(href).unwrap_or_default(),
            has_next: page.has_next(),
            next_href: page.next_number().map(href).unwrap_or_default(),
            first_href: href(1),
            last_href: href(page.num_pages),
            pages: page
                .page_numbers()
                .map(|number| PageLink {
                    number,
                    href: href(number),
                    current: number == page.number,
                })
                .collect(),
        }
    }
}

pub struct FeedContext {
    pub posts: Vec<PostCard>,
    pub has_posts: bool,
    pub paginator: PaginatorView,
}

impl FeedContext {
    pub fn new(page: &Page<PostRecord>, base_path: &str) -> Self {
        let posts: Vec<PostCard> = page.items.iter().map(PostCard::from).collect();
        Self {
            has_posts: !posts.is_empty(),
            posts,
            paginator: PaginatorView::new(page, base_path),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedContext>,
}
named_template!(IndexTemplate, "posts/index.html");

pub struct GroupContext {
    pub title: String,
    pub description: String,
    pub feed: FeedContext,
}

impl From<&GroupFeed> for GroupContext {
    fn from(feed: &GroupFeed) -> Self {
        Self {
            title: feed.group.title.clone(),
            description: feed.group.description.clone(),
            feed: FeedContext::new(&feed.page, &group_path(&feed.group.slug)),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupListTemplate {
    pub view: LayoutContext<GroupContext>,
}
named_template!(GroupListTemplate, "posts/group_list.html");

pub struct ProfileContext {
    pub username: String,
    pub post_count: u64,
    pub followers: u64,
    pub follows: u64,
    pub following: bool,
    pub can_follow: bool,
    pub follow_href: String,
    pub unfollow_href: String,
    pub feed: FeedContext,
}

impl ProfileContext {
    pub fn new(profile: &ProfileFeed, viewer: Option<&Viewer>) -> Self {
        let base = profile_path(&profile.author.username);
        Self {
            username: profile.author.username.clone(),
            post_count: profile.page.total_count,
            followers: profile.followers,
            follows: profile.follows,
            following: profile.following,
            can_follow: viewer.is_some_and(|viewer| viewer.user_id != profile.author.id),
            follow_href: format!("{base}follow/"),
            unfollow_href: format!("{base}unfollow/"),
            feed: FeedContext::new(&profile.page, &base),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}
named_template!(ProfileTemplate, "posts/profile.html");

#[derive(Clone)]
pub struct CommentView {
    pub id: i64,
    pub author: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
    pub can_delete: bool,
    pub delete_href: String,
}

impl CommentView {
    fn new(comment: &CommentRecord, viewer: Option<&Viewer>) -> Self {
        Self {
            id: comment.id,
            author: comment.author_username.clone(),
            author_href: profile_path(&comment.author_username),
            text: comment.text.clone(),
            published: format_timestamp(comment.created_at),
            can_delete: viewer.is_some_and(|viewer| viewer.user_id == comment.author_id),
            delete_href: format!("/posts/{}/comments/{}/delete/", comment.post_id, comment.id),
        }
    }
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub preview: String,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub edit_href: String,
    pub delete_href: String,
    pub comment_href: String,
}

impl PostDetailContext {
    pub fn new(detail: &PostDetail, viewer: Option<&Viewer>) -> Self {
        let id = detail.post.id;
        Self {
            post: PostCard::from(&detail.post),
            preview: detail.post.to_string(),
            author_post_count: detail.author_post_count,
            comments: detail
                .comments
                .iter()
                .map(|comment| CommentView::new(comment, viewer))
                .collect(),
            can_edit: viewer.is_some_and(|viewer| detail.post.is_authored_by(viewer.user_id)),
            edit_href: format!("/posts/{id}/edit/"),
            delete_href: format!("/posts/{id}/delete/"),
            comment_href: format!("/posts/{id}/comment/"),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}
named_template!(PostDetailTemplate, "posts/post_detail.html");

#[derive(Clone)]
pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Errors rendered next to each post form field.
#[derive(Clone, Default)]
pub struct PostFormErrors {
    pub text: Vec<String>,
    pub group: Vec<String>,
    pub image: Vec<String>,
    pub general: Vec<String>,
}

impl From<&FieldErrors> for PostFormErrors {
    fn from(errors: &FieldErrors) -> Self {
        Self {
            text: errors.get("text").to_vec(),
            group: errors.get("group").to_vec(),
            image: errors.get("image").to_vec(),
            general: errors.get(NON_FIELD).to_vec(),
        }
    }
}

pub struct PostFormContext {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub has_image: bool,
    pub image_url: String,
    pub errors: PostFormErrors,
}

impl PostFormContext {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: false,
            action: "/create/".to_string(),
            text: String::new(),
            groups: group_options(groups, None),
            has_image: false,
            image_url: String::new(),
            errors: PostFormErrors::default(),
        }
    }

    pub fn edit(post: &PostRecord, groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: true,
            action: format!("/posts/{}/edit/", post.id),
            text: post.text.clone(),
            groups: group_options(groups, post.group.as_ref().map(|group| group.id)),
            has_image: post.image.is_some(),
            image_url: post.image.as_deref().map(media_url).unwrap_or_default(),
            errors: PostFormErrors::default(),
        }
    }

    /// Re-display submitted values alongside their errors.
    pub fn with_submission(
        mut self,
        text: &str,
        group_id: Option<i64>,
        groups: &[GroupRecord],
        errors: &FieldErrors,
    ) -> Self {
        self.text = text.to_string();
        self.groups = group_options(groups, group_id);
        self.errors = PostFormErrors::from(errors);
        self
    }
}

fn group_options(groups: &[GroupRecord], selected: Option<i64>) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|group| GroupOption {
            id: group.id,
            title: group.to_string(),
            selected: selected == Some(group.id),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}
named_template!(PostFormTemplate, "posts/create_post.html");

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedContext>,
}
named_template!(FollowTemplate, "posts/follow.html");

pub struct LoginContext {
    pub next: String,
    pub has_error: bool,
    pub error: String,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}
named_template!(LoginTemplate, "auth/login.html");

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub home_href: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            home_href: "/".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
named_template!(NotFoundTemplate, "core/404.html");

#[cfg(test)]
mod tests {
    use crate::application::pagination::PageRequest;

    use super::*;

    #[test]
    fn paginator_links_follow_base_path() {
        let page = Page::new(vec![1, 2, 3], PageRequest::new(2, 3), 7);
        let view = PaginatorView::new(&page, "/group/cats/");

        assert!(view.show);
        assert_eq!(view.previous_href, "/group/cats/?page=1");
        assert_eq!(view.next_href, "/group/cats/?page=3");
        assert_eq!(view.pages.len(), 3);
        assert!(view.pages[1].current);
    }

    #[test]
    fn single_page_hides_controls() {
        let page: Page<i32> = Page::new(Vec::new(), PageRequest::new(1, 10), 0);
        let view = PaginatorView::new(&page, "/");
        assert!(!view.show);
        assert!(!view.has_next);
        assert!(view.next_href.is_empty());
    }

    #[test]
    fn not_found_page_records_template() {
        let response = render_not_found_response(None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.extensions().get::<RenderedTemplate>(),
            Some(&RenderedTemplate("core/404.html"))
        );
    }
}
