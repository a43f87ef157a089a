//! Response cache keys.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Identifies one cached rendering of a page.
///
/// The viewer is part of the key because the page chrome differs for
/// signed-in users.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub query_hash: u64,
    pub viewer: Option<i64>,
}

impl ResponseKey {
    pub fn new(path: impl Into<String>, query: &str, viewer: Option<i64>) -> Self {
        Self {
            path: path.into(),
            query_hash: hash_query(query),
            viewer,
        }
    }
}

/// Hash a raw query string; `?page=2` and `?page=02` are distinct entries.
pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_queries_produce_different_keys() {
        assert_ne!(hash_query("page=1"), hash_query("page=2"));
        assert_eq!(
            ResponseKey::new("/", "page=2", None),
            ResponseKey::new("/", "page=2", None)
        );
    }

    #[test]
    fn viewer_separates_entries() {
        assert_ne!(
            ResponseKey::new("/", "", None),
            ResponseKey::new("/", "", Some(1))
        );
    }
}
