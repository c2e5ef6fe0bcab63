//! Remote image download and on-disk media storage.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::application::repos::{AssetsRepo, CreateAssetParams, MediaError, MediaImporter};
use crate::domain::entities::AssetRecord;
use crate::infra::paapi::{ReqwestTransport, TransportError};

#[derive(Debug, Error)]
pub enum MediaStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("media payload is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<MediaStorageError> for MediaError {
    fn from(err: MediaStorageError) -> Self {
        match err {
            MediaStorageError::Io(err) => MediaError::Storage(err),
            other => MediaError::Storage(std::io::Error::other(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: i64,
}

/// Filesystem-backed media storage.
#[derive(Debug)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn store(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredMedia, MediaStorageError> {
        if data.is_empty() {
            return Err(MediaStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(data).await?;
        file.flush().await?;

        let size_bytes = i64::try_from(data.len()).map_err(|_| {
            MediaStorageError::Io(std::io::Error::other("media size exceeds supported range"))
        })?;

        Ok(StoredMedia {
            stored_path,
            checksum: hex::encode(Sha256::digest(data)),
            size_bytes,
        })
    }

    /// Remove a stored file. Missing files are treated as success.
    pub async fn delete(&self, stored_path: &str) -> Result<(), MediaStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(MediaStorageError::Io(err)),
        }
    }

    pub fn absolute_path(&self, stored_path: &str) -> Result<PathBuf, MediaStorageError> {
        self.resolve(stored_path)
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, MediaStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MediaStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn build_stored_path(original_name: &str) -> String {
    let (year, month, day) = time::OffsetDateTime::now_utc().to_calendar_date();
    let identifier = Uuid::new_v4();
    let filename = sanitize_filename(original_name);
    format!("{year}/{:02}/{:02}/{identifier}-{filename}", month as u8, day)
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

/// Last path segment of `url`, or `image` when there is none.
fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .unwrap_or("image")
        .to_string()
}

/// Prefer the declared `image/*` type; fall back to guessing from the URL path.
fn resolve_content_type(declared: Option<&str>, url: &Url) -> Option<String> {
    let declared = declared
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value.starts_with("image/"));

    declared.or_else(|| {
        mime_guess::from_path(url.path())
            .first()
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .map(|mime| mime.essence_str().to_string())
    })
}

/// Downloads product images and registers them as assets.
pub struct RemoteMediaImporter {
    client: Client,
    storage: MediaStorage,
    assets: Arc<dyn AssetsRepo>,
    max_bytes: u64,
}

impl RemoteMediaImporter {
    pub fn new(
        storage: MediaStorage,
        assets: Arc<dyn AssetsRepo>,
        max_bytes: u64,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(ReqwestTransport::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Failed(err.to_string()))?;

        Ok(Self {
            client,
            storage,
            assets,
            max_bytes,
        })
    }

    async fn download(&self, url: &Url) -> Result<(Vec<u8>, String), MediaError> {
        let download_error = |err: reqwest::Error| MediaError::Download {
            url: url.to_string(),
            message: err.to_string(),
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(download_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || MediaError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };

        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes)
        {
            return Err(too_large());
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let content_type =
            resolve_content_type(declared.as_deref(), url).ok_or_else(|| {
                MediaError::NotAnImage {
                    url: url.to_string(),
                    content_type: declared.clone().unwrap_or_default(),
                }
            })?;

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(download_error)? {
            if (data.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            data.extend_from_slice(&chunk);
        }

        Ok((data, content_type))
    }
}

#[async_trait]
impl MediaImporter for RemoteMediaImporter {
    async fn import_remote_image(
        &self,
        url: &str,
        record_id: Uuid,
    ) -> Result<AssetRecord, MediaError> {
        let parsed = Url::parse(url)
            .ok()
            .filter(|parsed| matches!(parsed.scheme(), "http" | "https"))
            .ok_or_else(|| MediaError::InvalidUrl {
                url: url.to_string(),
            })?;

        let (data, content_type) = self.download(&parsed).await?;
        let dimensions = imagesize::blob_size(&data).map_err(|_| MediaError::NotAnImage {
            url: url.to_string(),
            content_type: content_type.clone(),
        })?;

        let filename = filename_from_url(&parsed);
        let stored = self.storage.store(&filename, &data).await?;

        debug!(
            target = "infra::media::import_remote_image",
            url,
            stored_path = %stored.stored_path,
            size_bytes = stored.size_bytes,
            "image stored"
        );

        let params = CreateAssetParams {
            record_id: Some(record_id),
            source_url: url.to_string(),
            filename,
            content_type,
            size_bytes: stored.size_bytes,
            checksum: stored.checksum,
            stored_path: stored.stored_path.clone(),
            width: i32::try_from(dimensions.width).ok(),
            height: i32::try_from(dimensions.height).ok(),
        };

        match self.assets.create_asset(params).await {
            Ok(asset) => Ok(asset),
            Err(err) => {
                let _ = self.storage.delete(&stored.stored_path).await;
                Err(err.into())
            }
        }
    }
}
