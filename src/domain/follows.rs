//! Follow edge rules.

use super::error::DomainError;

/// A user may follow anyone but themselves.
pub fn ensure_can_follow(follower_id: i64, author_id: i64) -> Result<(), DomainError> {
    if follower_id == author_id {
        return Err(DomainError::validation(
            "author",
            "You cannot follow yourself.",
        ));
    }
    Ok(())
}
