//! Filesystem storage for post images.

use std::error::Error as StdError;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, pin_mut, stream};
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::application::posts::ImageStore;

/// Directory under the media root that post images are written to.
pub const POST_IMAGE_DIR: &str = "posts";
/// Leading bytes kept to recognise the image format.
const SIGNATURE_BYTES: usize = 32;
const MAX_NAME_ATTEMPTS: usize = 16;

/// Errors that can occur while interacting with the upload storage backend.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file exceeds configured body limit")]
    PayloadTooLarge {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file is not an image")]
    NotAnImage,
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
}

/// Result of storing an upload payload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Path relative to the media root, e.g. `posts/small.gif`.
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

/// Filesystem-backed media storage.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only names that look like images are accepted; contents are checked while storing.
    pub fn ensure_image(original_name: &str) -> Result<(), UploadStorageError> {
        let is_image = mime_guess::from_path(original_name)
            .first()
            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);
        if is_image {
            Ok(())
        } else {
            Err(UploadStorageError::NotAnImage)
        }
    }

    /// Stream a post image to disk and return where it landed.
    ///
    /// The file keeps its sanitised name under `posts/`; a short random suffix
    /// is added only when that name is already taken.
    pub async fn store_stream<S>(
        &self,
        original_name: &str,
        stream: S,
    ) -> Result<StoredUpload, UploadStorageError>
    where
        S: futures::Stream<Item = Result<Bytes, UploadStorageError>>,
    {
        Self::ensure_image(original_name)?;
        let (stored_path, absolute, mut file) = self.create_unique(original_name).await?;

        match write_payload(&mut file, stream).await {
            Ok(written) => Ok(StoredUpload {
                stored_path,
                checksum: written.checksum,
                size_bytes: written.size_bytes,
            }),
            Err(err) => {
                drop(file);
                let _ = fs::remove_file(&absolute).await;
                Err(err)
            }
        }
    }

    async fn create_unique(
        &self,
        original_name: &str,
    ) -> Result<(String, PathBuf, fs::File), UploadStorageError> {
        let filename = sanitize_filename(original_name);
        let directory = self.root.join(POST_IMAGE_DIR);
        fs::create_dir_all(&directory).await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                filename.clone()
            } else {
                with_random_suffix(&filename)
            };
            let stored_path = format!("{POST_IMAGE_DIR}/{candidate}");
            let absolute = self.resolve(&stored_path)?;
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&absolute)
                .await
            {
                Ok(file) => return Ok((stored_path, absolute, file)),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free name for upload {filename}"),
        )
        .into())
    }

    /// Store a fully-buffered payload.
    pub async fn store(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<StoredUpload, UploadStorageError> {
        let stream = stream::once(async move { Ok::<_, UploadStorageError>(data) });
        self.store_stream(original_name, stream).await
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Remove the stored payload. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(UploadStorageError::Io(err)),
        }
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for UploadStorage {
    async fn remove_image(&self, stored_path: &str) -> Result<(), std::io::Error> {
        self.delete(stored_path).await.map_err(|err| match err {
            UploadStorageError::Io(io) => io,
            other => std::io::Error::other(other.to_string()),
        })
    }
}

struct WrittenPayload {
    checksum: String,
    size_bytes: u64,
}

async fn write_payload<S>(
    file: &mut fs::File,
    stream: S,
) -> Result<WrittenPayload, UploadStorageError>
where
    S: futures::Stream<Item = Result<Bytes, UploadStorageError>>,
{
    let mut hasher = Sha256::new();
    let mut size_bytes: u64 = 0;
    let mut signature = Vec::with_capacity(SIGNATURE_BYTES);

    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }

        size_bytes = size_bytes
            .checked_add(chunk.len() as u64)
            .ok_or(UploadStorageError::SizeOverflow)?;
        if signature.len() < SIGNATURE_BYTES {
            let take = (SIGNATURE_BYTES - signature.len()).min(chunk.len());
            signature.extend_from_slice(&chunk[..take]);
        }
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
    }
    file.flush().await?;

    if size_bytes == 0 {
        return Err(UploadStorageError::EmptyPayload);
    }
    if imagesize::image_type(&signature).is_err() {
        return Err(UploadStorageError::NotAnImage);
    }

    Ok(WrittenPayload {
        checksum: hex::encode(hasher.finalize()),
        size_bytes,
    })
}

/// `cat.gif` becomes `cat_<7 chars>.gif`.
fn with_random_suffix(filename: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    let suffix = &simple[..7];
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{filename}_{suffix}"),
    }
}

fn sanitize_filename(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty());

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
