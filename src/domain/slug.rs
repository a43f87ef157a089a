//! Group slug derivation and validation.
//!
//! Titles are transliterated and slugified with the `slug` crate, so a
//! Cyrillic title like "Тест Кот" becomes `test-kot`. Slugs
//! supplied by hand are kept as typed but must stay URL-path friendly.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;
pub const MAX_SLUG_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug may only contain letters, digits, hyphens and underscores")]
    InvalidCharacters,
    #[error("slug must be at most {MAX_SLUG_LEN} characters")]
    TooLong,
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a slug from human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.chars().count() > MAX_SLUG_LEN {
        candidate = candidate.chars().take(MAX_SLUG_LEN).collect();
        candidate = candidate.trim_end_matches('-').to_string();
    }

    Ok(candidate)
}

/// Accept a hand-written slug as long as it is usable as a single path segment.
pub fn validate_slug(input: &str) -> Result<String, SlugError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if trimmed.chars().count() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::InvalidCharacters);
    }
    Ok(trimmed.to_string())
}

/// Derive a slug from `input`, suffixing `-2`, `-3`, … until `is_unique` accepts it.
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(base.clone())
        .await
        .map_err(SlugAsyncError::Predicate)?
    {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(candidate.clone())
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn derive_slug_transliterates_cyrillic() {
        let slug = derive_slug("Тест Кот").expect("slug");
        assert_eq!(slug, "test-kot");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn validate_slug_keeps_unicode_words() {
        assert_eq!(validate_slug("test_slug").as_deref(), Ok("test_slug"));
        assert_eq!(validate_slug("слаг-1").as_deref(), Ok("слаг-1"));
        assert_eq!(
            validate_slug("with space"),
            Err(SlugError::InvalidCharacters)
        );
        assert_eq!(validate_slug("a/b"), Err(SlugError::InvalidCharacters));
    }

    #[tokio::test]
    async fn unique_slug_appends_counter() {
        let taken = ["cats".to_string(), "cats-2".to_string()];
        let slug = generate_unique_slug_async("Cats", |candidate| {
            let free = !taken.contains(&candidate);
            async move { Ok::<_, Infallible>(free) }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "cats-3");
    }
}
