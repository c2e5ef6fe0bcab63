//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{AssetRecord, ProductRecord, RecordMeta};
use crate::domain::types::{PostStatus, PostType};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateRecordParams {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub post_type: PostType,
    /// Meta rows written with the record, keyed by meta key.
    pub meta: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct CreateAssetParams {
    pub record_id: Option<Uuid>,
    pub source_url: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub stored_path: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

#[async_trait]
pub trait RecordsRepo: Send + Sync {
    /// Create every record of `batch` with its meta rows in one transaction.
    /// On error nothing from the batch is persisted.
    async fn create_records(
        &self,
        batch: Vec<CreateRecordParams>,
    ) -> Result<Vec<ProductRecord>, RepoError>;

    async fn set_thumbnail(&self, record_id: Uuid, asset_id: Uuid) -> Result<(), RepoError>;

    async fn find_record(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError>;

    async fn list_meta(&self, record_id: Uuid) -> Result<Vec<RecordMeta>, RepoError>;
}

#[async_trait]
pub trait AssetsRepo: Send + Sync {
    async fn create_asset(&self, params: CreateAssetParams) -> Result<AssetRecord, RepoError>;
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to download `{url}`: {message}")]
    Download { url: String, message: String },
    #[error("`{url}` returned status {status}")]
    Status { url: String, status: u16 },
    #[error("`{url}` is not an image (content type `{content_type}`)")]
    NotAnImage { url: String, content_type: String },
    #[error("`{url}` exceeds the {limit} byte image limit")]
    TooLarge { url: String, limit: u64 },
    #[error("invalid image url `{url}`")]
    InvalidUrl { url: String },
    #[error("failed to store image: {0}")]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Downloads a remote image and registers it as an asset attached to a record.
#[async_trait]
pub trait MediaImporter: Send + Sync {
    async fn import_remote_image(
        &self,
        url: &str,
        record_id: Uuid,
    ) -> Result<AssetRecord, MediaError>;
}
