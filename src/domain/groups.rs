//! Group field rules.

use super::error::DomainError;
use super::slug::{SlugError, validate_slug};
use super::validation::REQUIRED_MESSAGE;

pub const MAX_TITLE_LEN: usize = 200;

pub fn normalize_title(input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("title", REQUIRED_MESSAGE));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::validation(
            "title",
            format!("Ensure this value has at most {MAX_TITLE_LEN} characters."),
        ));
    }
    Ok(trimmed.to_string())
}

/// A hand-supplied slug, or `None` when the field was left blank.
pub fn normalize_slug(input: Option<&str>) -> Result<Option<String>, DomainError> {
    match input.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => validate_slug(value)
            .map(Some)
            .map_err(|err: SlugError| DomainError::validation("slug", err.to_string())),
    }
}

pub fn normalize_description(input: &str) -> String {
    input.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_slug_means_derive() {
        assert_eq!(normalize_slug(None).unwrap(), None);
        assert_eq!(normalize_slug(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_slug(Some("test_slug")).unwrap().as_deref(),
            Some("test_slug")
        );
    }

    #[test]
    fn invalid_slug_is_a_field_error() {
        match normalize_slug(Some("bad slug")) {
            Err(DomainError::Validation { field, .. }) => assert_eq!(field, "slug"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn title_is_required() {
        assert!(normalize_title("   ").is_err());
        assert_eq!(normalize_title(" Cats ").unwrap(), "Cats");
    }
}
