//! Username rules.

use super::error::DomainError;
use super::validation::REQUIRED_MESSAGE;

pub const MAX_USERNAME_LEN: usize = 150;

/// Letters, digits and `@.+-_`, at most 150 characters.
pub fn normalize_username(input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("username", REQUIRED_MESSAGE));
    }
    if trimmed.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(
            "username",
            format!("Ensure this value has at most {MAX_USERNAME_LEN} characters."),
        ));
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_username_punctuation() {
        assert_eq!(normalize_username(" auth ").unwrap(), "auth");
        assert_eq!(normalize_username("user.name+1@x").unwrap(), "user.name+1@x");
        assert_eq!(normalize_username("Пользователь").unwrap(), "Пользователь");
    }

    #[test]
    fn rejects_blank_and_punctuation() {
        assert!(normalize_username("  ").is_err());
        assert!(normalize_username("with space").is_err());
        assert!(normalize_username("slash/name").is_err());
        assert!(normalize_username(&"a".repeat(151)).is_err());
    }
}
