//! Domain entities mirrored from persistent storage.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

/// Number of characters a post contributes to its display string.
pub const POST_PREVIEW_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub created_at: OffsetDateTime,
}

impl GroupRecord {
    pub fn to_ref(&self) -> GroupRef {
        GroupRef {
            id: self.id,
            slug: self.slug.clone(),
            title: self.title.clone(),
        }
    }
}

impl fmt::Display for GroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// The slice of a group that post listings carry along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: i64,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub author_id: i64,
    pub author_username: String,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
}

impl PostRecord {
    /// Leading characters of the text, counted in Unicode scalar values.
    pub fn preview(&self) -> &str {
        match self.text.char_indices().nth(POST_PREVIEW_CHARS) {
            Some((offset, _)) => &self.text[..offset],
            None => &self.text,
        }
    }

    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

impl fmt::Display for PostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preview())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowRecord {
    pub id: i64,
    pub follower_id: i64,
    pub author_id: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: i64,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
    pub revoked_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(text: &str) -> PostRecord {
        PostRecord {
            id: 1,
            text: text.to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            author_id: 1,
            author_username: "auth".to_string(),
            group: None,
            image: None,
        }
    }

    #[test]
    fn post_display_truncates_to_fifteen_characters() {
        let record = post("Тестовый поставввввава");
        assert_eq!(record.to_string(), "Тестовый постав");
        assert_eq!(record.to_string().chars().count(), POST_PREVIEW_CHARS);
    }

    #[test]
    fn short_post_displays_in_full() {
        assert_eq!(post("short").to_string(), "short");
    }

    #[test]
    fn group_display_is_its_title() {
        let group = GroupRecord {
            id: 1,
            title: "Тестовая группа".to_string(),
            slug: "test_slug".to_string(),
            description: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(group.to_string(), "Тестовая группа");
    }
}
