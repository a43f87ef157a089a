//! Paginated post listings for the index, group, profile and follow feeds.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{DEFAULT_PAGE_SIZE, Page, PageRequest};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostScope, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("unknown post {0}")]
    UnknownPost(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl FeedError {
    pub fn is_not_found(&self) -> bool {
        !matches!(self, FeedError::Repo(_))
    }
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostRecord>,
    /// Whether the current viewer follows this author.
    pub following: bool,
    pub followers: u64,
    pub follows: u64,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    comments: Arc<dyn CommentsRepo>,
    page_size: u32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            comments,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// One page of posts in `scope`. Pages past the end come back empty.
    pub async fn page(
        &self,
        scope: PostScope,
        number: u32,
    ) -> Result<Page<PostRecord>, FeedError> {
        let request = PageRequest::new(number, self.page_size);
        let total = self.posts.count_posts(scope).await?;
        let items = if request.offset() >= total {
            Vec::new()
        } else {
            self.posts.list_posts(scope, request).await?
        };
        debug!(
            target = "yatube::feed",
            ?scope,
            page = request.number,
            items = items.len(),
            total,
            "feed page loaded"
        );
        Ok(Page::new(items, request, total))
    }

    pub async fn index(&self, number: u32) -> Result<Page<PostRecord>, FeedError> {
        self.page(PostScope::All, number).await
    }

    pub async fn group(&self, slug: &str, number: u32) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_group_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = self.page(PostScope::Group(group.id), number).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer_id: Option<i64>,
        number: u32,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;
        let page = self.page(PostScope::Author(author.id), number).await?;

        let following = match viewer_id {
            Some(viewer_id) if viewer_id != author.id => {
                self.follows.follow_exists(viewer_id, author.id).await?
            }
            _ => false,
        };
        let followers = self.follows.count_followers(author.id).await?;
        let follows = self.follows.count_following(author.id).await?;

        Ok(ProfileFeed {
            author,
            page,
            following,
            followers,
            follows,
        })
    }

    /// Posts by every author `viewer_id` follows.
    pub async fn follow_index(
        &self,
        viewer_id: i64,
        number: u32,
    ) -> Result<Page<PostRecord>, FeedError> {
        self.page(PostScope::FollowedBy(viewer_id), number).await
    }

    pub async fn post_detail(&self, id: i64) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_post(id)
            .await?
            .ok_or(FeedError::UnknownPost(id))?;
        let author_post_count = self
            .posts
            .count_posts(PostScope::Author(post.author_id))
            .await?;
        let comments = self.comments.list_comments(post.id).await?;
        Ok(PostDetail {
            post,
            author_post_count,
            comments,
        })
    }
}
