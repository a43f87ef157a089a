use std::fmt::Write as _;

use axum::{
    http::{HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};

/// A `302 Found` redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    location: String,
}

impl Found {
    /// Bytes outside visible ASCII are percent-encoded so any username or slug
    /// makes a valid `Location` header.
    pub fn to(target: &str) -> Self {
        let mut location = String::with_capacity(target.len());
        for byte in target.bytes() {
            if byte.is_ascii_graphic() {
                location.push(char::from(byte));
            } else {
                let _ = write!(location, "%{byte:02X}");
            }
        }
        Self { location }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        match HeaderValue::try_from(self.location) {
            Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
