//! Post form binding for both urlencoded and multipart submissions.

use axum::{
    Form,
    body::Body,
    extract::FromRequest,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use axum_extra::extract::Multipart;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::{
    application::{
        error::HttpError,
        posts::{ImageChange, PostInput, UNKNOWN_GROUP_MESSAGE},
    },
    domain::validation::{FieldErrors, NON_FIELD},
    infra::uploads::{UploadStorage, UploadStorageError},
};

const SOURCE: &str = "infra::http::forms::read_post_form";
const INVALID_IMAGE_MESSAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
const EMPTY_IMAGE_MESSAGE: &str = "The submitted file is empty.";

/// A submitted post form. A new image is already on disk at `image`.
#[derive(Debug, Default)]
pub(super) struct PostForm {
    pub text: String,
    pub group: String,
    pub clear_image: bool,
    pub image: Option<String>,
    pub errors: FieldErrors,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPostForm {
    text: String,
    group: String,
    clear_image: Option<String>,
}

impl PostForm {
    /// Bind the text and group; a group that is not a number is an unknown choice.
    pub fn input(&mut self) -> PostInput {
        let group = self.group.trim();
        let group_id = if group.is_empty() {
            None
        } else {
            match group.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    self.errors.push("group", UNKNOWN_GROUP_MESSAGE);
                    None
                }
            }
        };

        PostInput {
            text: self.text.clone(),
            group_id,
        }
    }

    pub fn image_change(&self) -> ImageChange {
        match (&self.image, self.clear_image) {
            (Some(path), _) => ImageChange::Replace(path.clone()),
            (None, true) => ImageChange::Clear,
            (None, false) => ImageChange::Keep,
        }
    }

    /// Drop an uploaded image that ended up unused.
    pub async fn discard_image(&self, storage: &UploadStorage) {
        if let Some(path) = self.image.as_deref()
            && let Err(err) = storage.delete(path).await
        {
            warn!(target = SOURCE, path, error = %err, "failed to remove unused upload");
        }
    }
}

pub(super) async fn read_post_form(
    storage: &UploadStorage,
    limit_bytes: u64,
    request: Request<Body>,
) -> Result<PostForm, HttpError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if !is_multipart {
        let Form(raw) = Form::<RawPostForm>::from_request(request, &())
            .await
            .map_err(|err| {
                HttpError::new(
                    SOURCE,
                    StatusCode::BAD_REQUEST,
                    "Form data was invalid",
                    err.to_string(),
                )
            })?;
        return Ok(PostForm {
            text: raw.text,
            group: raw.group,
            clear_image: is_checked(raw.clear_image.as_deref()),
            ..PostForm::default()
        });
    }

    let mut multipart = Multipart::from_request(request, &()).await.map_err(|err| {
        HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Form data was invalid",
            err.to_string(),
        )
    })?;

    let mut form = PostForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                form.discard_image(storage).await;
                let status = err.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    form.errors.push(NON_FIELD, too_large_message(limit_bytes));
                    return Ok(form);
                }
                return Err(HttpError::from_error(
                    SOURCE,
                    StatusCode::BAD_REQUEST,
                    "Form data was invalid",
                    &err,
                ));
            }
        };

        match field.name() {
            Some("text") | Some("group") | Some("clear_image") => {
                let name = field.name().unwrap_or_default().to_string();
                let value = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Form data was invalid",
                        &err,
                    )
                })?;
                match name.as_str() {
                    "text" => form.text = value,
                    "group" => form.group = value,
                    _ => form.clear_image = is_checked(Some(&value)),
                }
            }
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default();
                // Browsers send an empty part when no file was chosen.
                if filename.is_empty() {
                    continue;
                }

                let stream = field.map(|result| {
                    result.map_err(|err| {
                        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
                            UploadStorageError::PayloadTooLarge {
                                source: Box::new(err),
                            }
                        } else {
                            UploadStorageError::PayloadStream {
                                source: Box::new(err),
                            }
                        }
                    })
                });

                match storage.store_stream(&filename, stream).await {
                    Ok(stored) => {
                        debug!(
                            target = SOURCE,
                            path = %stored.stored_path,
                            size_bytes = stored.size_bytes,
                            checksum = %stored.checksum,
                            "post image stored"
                        );
                        form.discard_image(storage).await;
                        form.image = Some(stored.stored_path);
                    }
                    Err(UploadStorageError::NotAnImage) => {
                        form.errors.push("image", INVALID_IMAGE_MESSAGE);
                    }
                    Err(UploadStorageError::EmptyPayload) => {
                        form.errors.push("image", EMPTY_IMAGE_MESSAGE);
                    }
                    Err(UploadStorageError::PayloadTooLarge { .. })
                    | Err(UploadStorageError::SizeOverflow) => {
                        form.discard_image(storage).await;
                        form.image = None;
                        form.errors.push("image", too_large_message(limit_bytes));
                        return Ok(form);
                    }
                    Err(err) => {
                        error!(target = SOURCE, error = %err, "failed to store post image");
                        form.errors
                            .push("image", "Could not store the image, please retry later.");
                    }
                }
            }
            _ => continue,
        }
    }

    Ok(form)
}

fn is_checked(value: Option<&str>) -> bool {
    matches!(
        value.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("on" | "true" | "1" | "yes")
    )
}

fn too_large_message(limit_bytes: u64) -> String {
    let limit_mib = limit_bytes.div_ceil(1_048_576);
    format!("File is too large (limit is {limit_mib} MiB)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_group_means_no_group() {
        let mut form = PostForm {
            text: "hello".to_string(),
            group: "  ".to_string(),
            ..PostForm::default()
        };
        let input = form.input();
        assert_eq!(input.group_id, None);
        assert!(form.errors.is_empty());
    }

    #[test]
    fn non_numeric_group_is_an_unknown_choice() {
        let mut form = PostForm {
            group: "cats".to_string(),
            ..PostForm::default()
        };
        form.input();
        assert_eq!(form.errors.first("group"), Some(UNKNOWN_GROUP_MESSAGE));
    }

    #[test]
    fn new_image_takes_precedence_over_clear() {
        let form = PostForm {
            clear_image: true,
            image: Some("posts/a.gif".to_string()),
            ..PostForm::default()
        };
        assert_eq!(
            form.image_change(),
            ImageChange::Replace("posts/a.gif".to_string())
        );

        let form = PostForm {
            clear_image: true,
            ..PostForm::default()
        };
        assert_eq!(form.image_change(), ImageChange::Clear);
        assert_eq!(PostForm::default().image_change(), ImageChange::Keep);
    }

    #[test]
    fn too_large_message_rounds_up_to_mebibytes() {
        assert_eq!(too_large_message(5 * 1024 * 1024 + 1), "File is too large (limit is 6 MiB)");
    }
}
