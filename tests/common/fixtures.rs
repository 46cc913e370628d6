//! Test fixtures for creating test data
#![allow(dead_code)]
#![allow(clippy::needless_update)]

use ashcan::storage::{
    ByteStream, ObjectInfo, ObjectPage, StorageBackend, StorageError, StorageObject,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use ashcan::orm::{boards, posts, threads};

/// Create a test board with explicit lifecycle overrides so tests don't
/// depend on ambient configuration.
pub async fn create_test_board(
    db: &DatabaseConnection,
    slug: &str,
    max_active_threads: Option<i32>,
    bump_limit: Option<i32>,
) -> Result<boards::Model, DbErr> {
    let board = boards::ActiveModel {
        slug: Set(slug.to_string()),
        title: Set(format!("/{}/", slug)),
        description: Set(Some("Test board".to_string())),
        is_nsfw: Set(false),
        show_poster_ids: Set(false),
        show_flags: Set(false),
        max_active_threads: Set(max_active_threads),
        bump_limit: Set(bump_limit),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    board.insert(db).await
}

/// Insert a thread directly, bypassing the capacity enforcer. Useful for
/// staging over-capacity boards the backstop must converge.
pub async fn create_test_thread(
    db: &DatabaseConnection,
    board_id: i32,
    subject: &str,
) -> Result<threads::Model, DbErr> {
    let now = Utc::now().naive_utc();
    let thread = threads::ActiveModel {
        board_id: Set(board_id),
        subject: Set(Some(subject.to_string())),
        created_at: Set(now),
        bumped_at: Set(now),
        salt: Set(uuid::Uuid::new_v4().to_string()),
        is_sticky: Set(false),
        is_alive: Set(true),
        retired_at: Set(None),
        post_count: Set(1),
        ..Default::default()
    };
    thread.insert(db).await
}

/// Insert a post directly, without touching the thread's cached count or
/// bump timestamp.
pub async fn create_test_post(
    db: &DatabaseConnection,
    thread_id: i32,
    board_id: i32,
    content: &str,
    ip_address: &str,
    media_key: Option<String>,
) -> Result<posts::Model, DbErr> {
    let post = posts::ActiveModel {
        thread_id: Set(thread_id),
        board_id: Set(board_id),
        content: Set(content.to_string()),
        media_key: Set(media_key.clone()),
        media_kind: Set(media_key.map(|_| posts::MediaKind::Image)),
        ip_address: Set(ip_address.to_string()),
        poster_id: Set(None),
        country_code: Set(None),
        name_color: Set("#117743".to_string()),
        suppress_bump: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    post.insert(db).await
}

/// Backdate a thread's bump timestamp to control eviction order.
pub async fn set_bumped_at(
    db: &DatabaseConnection,
    thread_id: i32,
    bumped_at: NaiveDateTime,
) -> Result<(), DbErr> {
    threads::Entity::update_many()
        .col_expr(threads::Column::BumpedAt, Expr::value(bumped_at))
        .filter(threads::Column::Id.eq(thread_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Mark a thread sticky without going through the service layer.
pub async fn set_sticky(
    db: &DatabaseConnection,
    thread_id: i32,
    sticky: bool,
) -> Result<(), DbErr> {
    threads::Entity::update_many()
        .col_expr(threads::Column::IsSticky, Expr::value(sticky))
        .filter(threads::Column::Id.eq(thread_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Force a thread dead with a chosen retirement time, e.g. far enough in
/// the past for the reaper to act on it.
pub async fn retire_test_thread(
    db: &DatabaseConnection,
    thread_id: i32,
    retired_at: NaiveDateTime,
) -> Result<(), DbErr> {
    threads::Entity::update_many()
        .col_expr(threads::Column::IsAlive, Expr::value(false))
        .col_expr(threads::Column::RetiredAt, Expr::value(Some(retired_at)))
        .filter(threads::Column::Id.eq(thread_id))
        .exec(db)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory storage backend

struct StoredBlob {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// In-memory StorageBackend for exercising the reconciler and the blob
/// cleanup paths without an object store.
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a blob whose last-modified time is `age_minutes` in the past.
    pub fn insert_with_age(&self, key: &str, data: Vec<u8>, age_minutes: i64) {
        self.blobs.lock().unwrap().insert(
            key.to_string(),
            StoredBlob {
                data,
                last_modified: Utc::now() - Duration::minutes(age_minutes),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.blobs.lock().unwrap().clear();
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().insert(
            filename.to_string(),
            StoredBlob {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(
        &self,
        key: &str,
        _range: Option<String>,
    ) -> Result<StorageObject, StorageError> {
        let data = self
            .blobs
            .lock()
            .unwrap()
            .get(key)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let content_length = data.len() as i64;
        let body: ByteStream = Box::pin(futures::stream::once(async move {
            Ok(actix_web::web::Bytes::from(data))
        }));

        Ok(StorageObject {
            body,
            content_length: Some(content_length),
            content_type: None,
            content_range: None,
        })
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        Ok(self.contains(filename))
    }

    async fn list_objects(
        &self,
        _continuation: Option<String>,
    ) -> Result<ObjectPage, StorageError> {
        let objects = self
            .blobs
            .lock()
            .unwrap()
            .iter()
            .map(|(key, blob)| ObjectInfo {
                key: key.clone(),
                last_modified: Some(blob.last_modified),
                size: blob.data.len() as i64,
            })
            .collect();

        Ok(ObjectPage {
            objects,
            continuation: None,
        })
    }

    async fn delete_object(&self, filename: &str) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().remove(filename);
        Ok(())
    }
}

/// Shared in-memory store, installed as the global backend on first use.
pub fn memory_storage() -> Arc<MemoryStorage> {
    static STORE: Lazy<Arc<MemoryStorage>> = Lazy::new(|| Arc::new(MemoryStorage::new()));
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        ashcan::storage::init_storage(STORE.clone());
    });
    STORE.clone()
}
