//! Per-field validation messages collected while binding forms.

use std::collections::BTreeMap;
use std::fmt;

use super::error::DomainError;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const NON_FIELD: &str = "__all__";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: BTreeMap<&'static str, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.entry(field).or_default().push(message.into());
    }

    /// Keep the value of a successful check, or file the failure under its field.
    pub fn record<T>(&mut self, result: Result<T, DomainError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(DomainError::Validation { field, message }) => {
                self.push(field, message);
                None
            }
            Err(other) => {
                self.push(NON_FIELD, other.to_string());
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.entries
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.entries {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<DomainError> for FieldErrors {
    fn from(error: DomainError) -> Self {
        let mut errors = Self::new();
        errors.record::<()>(Err(error));
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_files_validation_errors_under_their_field() {
        let mut errors = FieldErrors::new();
        let value: Option<()> = errors.record(Err(DomainError::validation("text", "empty")));
        assert!(value.is_none());
        assert_eq!(errors.first("text"), Some("empty"));
        assert!(errors.get("group").is_empty());
    }

    #[test]
    fn display_joins_all_messages() {
        let mut errors = FieldErrors::new();
        errors.push("group", "unknown");
        errors.push("text", REQUIRED_MESSAGE);
        assert_eq!(
            errors.to_string(),
            "group: unknown; text: This field is required."
        );
    }
}
