//! Local filesystem storage backend.

use super::{ByteStream, ObjectInfo, ObjectPage, StorageBackend, StorageError, StorageObject};
use actix_web::web::{self, Bytes};
use async_trait::async_trait;
use futures::stream;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Local filesystem storage backend.
pub struct LocalStorage {
    /// Base path for blob storage
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend.
    ///
    /// The `base_path` directory will be created if it doesn't exist.
    pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)?;
        log::info!("LocalStorage initialized at {:?}", base_path);
        Ok(Self { base_path })
    }

    /// Get the full path for a blob, including prefix directories.
    fn get_file_path(&self, filename: &str) -> PathBuf {
        if filename.len() < 4 {
            // Fallback for short filenames
            self.base_path.join(filename)
        } else {
            let prefix1 = &filename[0..2];
            let prefix2 = &filename[2..4];
            self.base_path.join(prefix1).join(prefix2).join(filename)
        }
    }

    /// Parse HTTP Range header.
    /// Supports formats like "bytes=0-499" or "bytes=500-"
    fn parse_range(range: &str, file_size: u64) -> Result<(u64, u64), StorageError> {
        let range = range
            .strip_prefix("bytes=")
            .ok_or_else(|| StorageError::InvalidRange("Invalid range format".into()))?;

        let parts: Vec<&str> = range.split('-').collect();
        if parts.len() != 2 {
            return Err(StorageError::InvalidRange("Invalid range format".into()));
        }

        let start: u64 = if parts[0].is_empty() {
            // Suffix range like "-500" means last 500 bytes
            let suffix: u64 = parts[1]
                .parse()
                .map_err(|_| StorageError::InvalidRange("Invalid range number".into()))?;
            file_size.saturating_sub(suffix)
        } else {
            parts[0]
                .parse()
                .map_err(|_| StorageError::InvalidRange("Invalid range number".into()))?
        };

        let end: u64 = if parts[1].is_empty() {
            file_size - 1
        } else {
            parts[1]
                .parse()
                .map_err(|_| StorageError::InvalidRange("Invalid range number".into()))?
        };

        if start > end || start >= file_size {
            return Err(StorageError::InvalidRange("Range not satisfiable".into()));
        }

        Ok((start, end.min(file_size - 1)))
    }

    /// Get MIME type from filename extension.
    fn get_mime_type(filename: &str) -> Option<String> {
        let ext = filename.rsplit('.').next()?;
        let mime = match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "avif" => "image/avif",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "mov" => "video/quicktime",
            "mp3" => "audio/mpeg",
            "ogg" => "audio/ogg",
            "flac" => "audio/flac",
            "wav" => "audio/wav",
            _ => "application/octet-stream",
        };
        Some(mime.to_string())
    }

    /// Collect every stored blob under a directory, recursing through the
    /// two-level prefix layout.
    fn walk_files(dir: &Path, out: &mut Vec<ObjectInfo>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::walk_files(&path, out)?;
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                let metadata = entry.metadata()?;
                let last_modified = metadata
                    .modified()
                    .ok()
                    .map(|t| chrono::DateTime::<chrono::Utc>::from(t));
                out.push(ObjectInfo {
                    key: name.to_string(),
                    last_modified,
                    size: metadata.len() as i64,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError> {
        let path = self.get_file_path(filename);
        log::info!("LocalStorage: put_object: {:?}", path);

        // Use web::block for blocking file operations
        web::block(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, data)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        Ok(())
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<String>,
    ) -> Result<StorageObject, StorageError> {
        let path = self.get_file_path(key);
        log::debug!("LocalStorage: get_object: {:?}", path);

        let key_owned = key.to_string();
        let range_clone = range.clone();
        let path_clone = path.clone();

        // Use web::block for blocking file operations
        let result = web::block(
            move || -> Result<(Vec<u8>, Option<String>), StorageError> {
                let metadata = fs::metadata(&path_clone)?;
                let file_size = metadata.len();

                // Handle range request
                let (start, end, content_range) = if let Some(ref range_header) = range_clone {
                    let (start, end) = LocalStorage::parse_range(range_header, file_size)?;
                    let range_str = format!("bytes {}-{}/{}", start, end, file_size);
                    (start, end, Some(range_str))
                } else {
                    (0, file_size.saturating_sub(1), None)
                };

                let bytes_to_read = (end - start + 1) as usize;

                let mut file = fs::File::open(&path_clone)?;
                if start > 0 {
                    file.seek(SeekFrom::Start(start))?;
                }

                let mut buffer = vec![0u8; bytes_to_read];
                file.read_exact(&mut buffer)?;

                Ok((buffer, content_range))
            },
        )
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        let (buffer, content_range) = result;
        let content_length = buffer.len() as i64;
        let content_type = Self::get_mime_type(&key_owned);

        // Create streaming body
        let body: ByteStream = Box::pin(stream::once(async move { Ok(Bytes::from(buffer)) }));

        Ok(StorageObject {
            body,
            content_length: Some(content_length),
            content_type,
            content_range,
        })
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.get_file_path(filename);
        Ok(path.exists())
    }

    async fn list_objects(
        &self,
        _continuation: Option<String>,
    ) -> Result<ObjectPage, StorageError> {
        let base = self.base_path.clone();

        // The local tree fits in one page; continuation is always None.
        let objects = web::block(move || -> std::io::Result<Vec<ObjectInfo>> {
            let mut out = Vec::new();
            if base.exists() {
                LocalStorage::walk_files(&base, &mut out)?;
            }
            Ok(out)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        Ok(ObjectPage {
            objects,
            continuation: None,
        })
    }

    async fn delete_object(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.get_file_path(filename);
        log::info!("LocalStorage: delete_object: {:?}", path);

        match web::block(move || fs::remove_file(&path))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
        {
            Ok(()) => Ok(()),
            // Idempotent: a missing blob is already deleted.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_full() {
        assert_eq!(
            LocalStorage::parse_range("bytes=0-499", 1000).unwrap(),
            (0, 499)
        );
    }

    #[test]
    fn test_parse_range_open_ended() {
        assert_eq!(
            LocalStorage::parse_range("bytes=500-", 1000).unwrap(),
            (500, 999)
        );
    }

    #[test]
    fn test_parse_range_suffix() {
        assert_eq!(
            LocalStorage::parse_range("bytes=-200", 1000).unwrap(),
            (800, 999)
        );
    }

    #[test]
    fn test_parse_range_unsatisfiable() {
        assert!(LocalStorage::parse_range("bytes=1000-", 1000).is_err());
    }

    #[test]
    fn test_file_path_sharding() {
        let storage = LocalStorage {
            base_path: PathBuf::from("/tmp/blobs"),
        };
        assert_eq!(
            storage.get_file_path("abcdef.jpg"),
            PathBuf::from("/tmp/blobs/ab/cd/abcdef.jpg")
        );
        assert_eq!(storage.get_file_path("ab"), PathBuf::from("/tmp/blobs/ab"));
    }
}
