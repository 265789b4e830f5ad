//! Object storage behind a trait: S3 when configured, an in-process memory
//! store otherwise. Uploads return a public URL either way.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the object and return its public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Fetch for serving; only the memory backend answers this (S3 objects are
    /// served by S3 itself).
    async fn get(&self, key: &str) -> Option<(Bytes, String)>;
}

/// Build the process-wide store from config.
pub async fn from_config() -> Arc<dyn ObjectStore> {
    let storage = &config::config().storage;
    match (&storage.s3_bucket, &storage.s3_region) {
        (Some(bucket), region) => {
            let mut loader = aws_config::from_env();
            if let Some(region) = region {
                loader = loader.region(aws_config::Region::new(region.clone()));
            }
            let sdk_config = loader.load().await;
            let client = aws_sdk_s3::Client::new(&sdk_config);
            info!("object storage: S3 bucket {}", bucket);
            Arc::new(S3Store {
                client,
                bucket: bucket.clone(),
                public_base_url: storage.public_base_url.clone().unwrap_or_else(|| {
                    format!(
                        "https://{}.s3.{}.amazonaws.com",
                        bucket,
                        storage.s3_region.as_deref().unwrap_or("us-east-1")
                    )
                }),
            })
        }
        (None, _) => {
            warn!("S3 not configured; uploads use the in-memory store");
            Arc::new(MemoryStore::default())
        }
    }
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(aws_sdk_s3::primitives::ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        Ok(format!("{}/{}", self.public_base_url.trim_end_matches('/'), key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, _key: &str) -> Option<(Bytes, String)> {
        None
    }
}

/// Development fallback; objects live for the lifetime of the process and are
/// served from `/files/:key`.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, (Bytes, String)>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String, StorageError> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(format!("/files/{}", key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn get(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.read().await.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::default();
        let url = store
            .put("img/a.png", Bytes::from_static(b"abc"), "image/png")
            .await
            .expect("put");
        assert_eq!(url, "/files/img/a.png");

        let (data, content_type) = store.get("img/a.png").await.expect("stored");
        assert_eq!(&data[..], b"abc");
        assert_eq!(content_type, "image/png");

        store.delete("img/a.png").await.expect("delete");
        assert!(store.get("img/a.png").await.is_none());
    }

    #[tokio::test]
    async fn memory_delete_missing_is_not_found() {
        let store = MemoryStore::default();
        assert!(matches!(
            store.delete("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
