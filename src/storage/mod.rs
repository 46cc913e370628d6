//! Storage backend abstraction for media blobs.
//!
//! Supports multiple backends:
//! - `local`: Local filesystem storage
//! - `s3`: S3-compatible object storage (MinIO, AWS S3, etc.)
//!
//! Blobs are immutable once written and named by content hash; the
//! relational store is the source of truth for which keys are referenced.
//! Listing and deletion exist so the reconciler can reclaim orphans.

pub mod local;
pub mod s3;

use crate::app_config;
use actix_web::web::Bytes;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use once_cell::sync::OnceCell;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed stream of bytes for streaming file content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Represents a retrieved storage object with metadata.
pub struct StorageObject {
    /// Streaming body content
    pub body: ByteStream,
    /// Content length in bytes
    pub content_length: Option<i64>,
    /// MIME content type
    pub content_type: Option<String>,
    /// Content range for partial responses
    pub content_range: Option<String>,
}

/// One entry from a listing pass. `key` is the canonical blob name with any
/// backend sharding prefix stripped, so it compares directly against the
/// media keys stored in the database.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: i64,
}

/// One page of a listing. `continuation` is opaque to the caller; None
/// means the listing is exhausted.
#[derive(Debug, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectInfo>,
    pub continuation: Option<String>,
}

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// File not found
    NotFound(String),
    /// I/O error
    Io(std::io::Error),
    /// S3 error
    S3(String),
    /// Invalid range request
    InvalidRange(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::S3(msg) => write!(f, "S3 error: {}", msg),
            StorageError::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Trait for storage backends.
///
/// All storage backends must implement this trait to provide
/// a unified interface for blob storage operations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a blob.
    ///
    /// Blobs are stored with a prefix structure based on the filename:
    /// `{filename[0:2]}/{filename[2:4]}/{filename}`
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError>;

    /// Retrieve a blob.
    ///
    /// The `key` is the canonical filename (hash + extension).
    /// Optional `range` parameter supports HTTP Range requests for streaming.
    async fn get_object(
        &self,
        key: &str,
        range: Option<String>,
    ) -> Result<StorageObject, StorageError>;

    /// Check if a blob exists.
    async fn exists(&self, filename: &str) -> Result<bool, StorageError>;

    /// List one page of stored blobs. Pass the previous page's
    /// `continuation` to advance; start with None.
    async fn list_objects(&self, continuation: Option<String>)
        -> Result<ObjectPage, StorageError>;

    /// Delete a blob by canonical filename. Idempotent: deleting a missing
    /// blob is not an error.
    async fn delete_object(&self, filename: &str) -> Result<(), StorageError>;
}

/// Drain the paginated listing into one vector. The reconciler needs the
/// complete key set to compute orphans.
pub async fn list_all_objects(
    storage: &dyn StorageBackend,
) -> Result<Vec<ObjectInfo>, StorageError> {
    let mut all = Vec::new();
    let mut continuation = None;

    loop {
        let page = storage.list_objects(continuation).await?;
        all.extend(page.objects);
        match page.continuation {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }

    Ok(all)
}

static STORAGE: OnceCell<Arc<dyn StorageBackend>> = OnceCell::new();

/// Install the global storage backend. Called once at startup (or from
/// test fixtures with an in-memory backend).
pub fn init_storage(backend: Arc<dyn StorageBackend>) {
    if STORAGE.set(backend).is_err() {
        log::warn!("init_storage called twice; keeping existing backend");
    }
}

/// Build the backend selected by configuration and install it.
/// Panics on an unusable local path; startup only.
pub fn init_from_config() {
    let conf = app_config::storage();
    let backend: Arc<dyn StorageBackend> = match conf.backend.as_str() {
        "s3" => Arc::new(s3::S3Storage::new(
            rusoto_core::Region::Custom {
                name: conf.s3_region.clone(),
                endpoint: conf.s3_endpoint.clone(),
            },
            conf.s3_bucket.clone(),
            conf.s3_public_url.clone(),
        )),
        _ => Arc::new(
            local::LocalStorage::new(conf.local_path.clone().into())
                .expect("Failed to initialize local storage."),
        ),
    };
    init_storage(backend);
}

/// Get the global storage backend. Panics if uninitialized.
pub fn get_storage() -> &'static Arc<dyn StorageBackend> {
    STORAGE.get().expect("Storage backend not initialized.")
}

/// Get the global storage backend, or None before initialization.
pub fn try_get_storage() -> Option<&'static Arc<dyn StorageBackend>> {
    STORAGE.get()
}
