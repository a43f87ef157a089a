//! In-process repositories.
//!
//! Keeps every table in a single `tokio::sync::RwLock` and enforces the same
//! constraints as the Postgres schema: unique usernames, slugs and follow
//! pairs, foreign keys, `ON DELETE CASCADE` for comments and
//! `ON DELETE SET NULL` for a post's group.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateSessionParams,
    FollowsRepo, GroupsRepo, HealthRepo, PostScope, PostsRepo, PostsWriteRepo, RepoError,
    SessionsRepo, UpdateGroupParams, UpdatePostParams, UsersRepo, constraints,
};
use crate::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, SessionRecord, UserRecord,
};

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    text: String,
    created_at: OffsetDateTime,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, UserRecord>,
    groups: BTreeMap<i64, GroupRecord>,
    posts: BTreeMap<i64, StoredPost>,
    comments: BTreeMap<i64, CommentRecord>,
    follows: BTreeMap<i64, FollowRecord>,
    sessions: BTreeMap<i64, SessionRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username(&self, user_id: i64) -> Result<String, RepoError> {
        self.users
            .get(&user_id)
            .map(|user| user.username.clone())
            .ok_or_else(|| RepoError::integrity(format!("user {user_id} does not exist")))
    }

    fn check_group(&self, group_id: Option<i64>) -> Result<(), RepoError> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(RepoError::integrity(format!("group {id} does not exist")))
            }
            _ => Ok(()),
        }
    }

    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.groups
            .values()
            .any(|group| group.slug == slug && Some(group.id) != except)
    }

    fn hydrate(&self, post: &StoredPost) -> PostRecord {
        PostRecord {
            id: post.id,
            text: post.text.clone(),
            created_at: post.created_at,
            author_id: post.author_id,
            author_username: self
                .users
                .get(&post.author_id)
                .map(|user| user.username.clone())
                .unwrap_or_default(),
            group: post
                .group_id
                .and_then(|id| self.groups.get(&id))
                .map(GroupRecord::to_ref),
            image: post.image.clone(),
        }
    }

    fn in_scope(&self, post: &StoredPost, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(follower_id) => self.follows.values().any(|follow| {
                follow.follower_id == follower_id && follow.author_id == post.author_id
            }),
        }
    }

    /// Newest first; ties on `created_at` go to the larger id.
    fn scoped(&self, scope: PostScope) -> Vec<&StoredPost> {
        let mut posts: Vec<&StoredPost> = self
            .posts
            .values()
            .filter(|post| self.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepositories {
    tables: RwLock<Tables>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a post's creation time. Lets tests build deterministic orderings.
    pub async fn set_post_created_at(
        &self,
        post_id: i64,
        created_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(&post_id).ok_or(RepoError::NotFound)?;
        post.created_at = created_at;
        Ok(())
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn create_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|user| user.username == username) {
            return Err(RepoError::duplicate(constraints::USERS_USERNAME));
        }
        let id = tables.next_id();
        let user = UserRecord {
            id,
            username: username.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<GroupRecord> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_group(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .groups
            .values()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&params.slug, None) {
            return Err(RepoError::duplicate(constraints::GROUPS_SLUG));
        }
        let id = tables.next_id();
        let group = GroupRecord {
            id,
            title: params.title,
            slug: params.slug,
            description: params.description,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn update_group(&self, params: UpdateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&params.slug, Some(params.id)) {
            return Err(RepoError::duplicate(constraints::GROUPS_SLUG));
        }
        let group = tables
            .groups
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        group.title = params.title;
        group.slug = params.slug;
        group.description = params.description;
        Ok(group.clone())
    }

    async fn delete_group(&self, id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(
        &self,
        scope: PostScope,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        Ok(tables
            .scoped(scope)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|post| tables.hydrate(post))
            .collect())
    }

    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.scoped(scope).len() as u64)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).map(|post| tables.hydrate(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.write().await;
        tables.username(params.author_id)?;
        tables.check_group(params.group_id)?;
        let id = tables.next_id();
        let post = StoredPost {
            id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        let record = tables.hydrate(&post);
        tables.posts.insert(id, post);
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_group(params.group_id)?;
        let post = tables
            .posts
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let post = post.clone();
        Ok(tables.hydrate(&post))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let author_username = tables.username(params.author_id)?;
        if !tables.posts.contains_key(&params.post_id) {
            return Err(RepoError::integrity(format!(
                "post {} does not exist",
                params.post_id
            )));
        }
        let id = tables.next_id();
        let comment = CommentRecord {
            id,
            post_id: params.post_id,
            author_id: params.author_id,
            author_username,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<CommentRecord> = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn find_comment(&self, id: i64) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn create_follow(
        &self,
        follower_id: i64,
        author_id: i64,
    ) -> Result<Option<FollowRecord>, RepoError> {
        let mut tables = self.tables.write().await;
        tables.username(follower_id)?;
        tables.username(author_id)?;
        if follower_id == author_id {
            return Err(RepoError::integrity("follower and author must differ"));
        }
        if tables
            .follows
            .values()
            .any(|follow| follow.follower_id == follower_id && follow.author_id == author_id)
        {
            return Ok(None);
        }
        let id = tables.next_id();
        let follow = FollowRecord {
            id,
            follower_id,
            author_id,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.follows.insert(id, follow.clone());
        Ok(Some(follow))
    }

    async fn delete_follow(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables.follows.retain(|_, follow| {
            !(follow.follower_id == follower_id && follow.author_id == author_id)
        });
        Ok(tables.follows.len() != before)
    }

    async fn follow_exists(&self, follower_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .follows
            .values()
            .any(|follow| follow.follower_id == follower_id && follow.author_id == author_id))
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|follow| follow.author_id == author_id)
            .count() as u64)
    }

    async fn count_following(&self, follower_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|follow| follow.follower_id == follower_id)
            .count() as u64)
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepositories {
    async fn create_session(
        &self,
        params: CreateSessionParams,
    ) -> Result<SessionRecord, RepoError> {
        let mut tables = self.tables.write().await;
        tables.username(params.user_id)?;
        if tables
            .sessions
            .values()
            .any(|session| session.prefix == params.prefix)
        {
            return Err(RepoError::duplicate(constraints::SESSIONS_PREFIX));
        }
        let id = tables.next_id();
        let session = SessionRecord {
            id,
            user_id: params.user_id,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
            revoked_at: None,
        };
        tables.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn find_session_by_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .sessions
            .values()
            .find(|session| session.prefix == prefix)
            .cloned())
    }

    async fn revoke_session(
        &self,
        id: i64,
        revoked_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let session = tables.sessions.get_mut(&id).ok_or(RepoError::NotFound)?;
        session.revoked_at.get_or_insert(revoked_at);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
