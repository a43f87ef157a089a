//! Post and comment text rules.

use super::error::DomainError;
use super::validation::REQUIRED_MESSAGE;

/// Post bodies must carry something besides whitespace.
pub fn normalize_post_text(input: &str) -> Result<String, DomainError> {
    normalize_body("text", input)
}

pub fn normalize_comment_text(input: &str) -> Result<String, DomainError> {
    normalize_body("text", input)
}

fn normalize_body(field: &'static str, input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, REQUIRED_MESSAGE));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_text_is_required_error() {
        match normalize_post_text(" \n\t ") {
            Err(DomainError::Validation { field, message }) => {
                assert_eq!(field, "text");
                assert_eq!(message, REQUIRED_MESSAGE);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(normalize_post_text("  hi  ").unwrap(), "hi");
        assert_eq!(normalize_comment_text("ok").unwrap(), "ok");
    }
}
