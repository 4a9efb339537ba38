//! The storage-provider seam. Byte storage is pluggable behind one narrow
//! contract; the kind is resolved once at startup from configuration, never
//! per request. Object-store backends (S3, MinIO, OVH) live outside this
//! crate and mount behind the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use strum::{Display, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage object not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Provider-assigned location of an uploaded object.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: String,
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn upload_file(&self, file_id: &str, bytes: &[u8]) -> Result<StoredFile, StorageError>;
    async fn get_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageKind {
    Local,
    Memory,
}

/// Resolve the provider from configuration. Called once at process start.
pub fn provider_from_config() -> Arc<dyn StorageProvider> {
    let config = common::config::Config::get();
    let kind = StorageKind::from_str(&config.storage_kind).unwrap_or(StorageKind::Local);

    match kind {
        StorageKind::Local => Arc::new(LocalStorage::new(PathBuf::from(&config.storage_root))),
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
    }
}

/// Filesystem-backed provider: objects live under `{root}/files/{file_id}`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn upload_file(&self, file_id: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        let relative = format!("files/{file_id}");
        let full = self.full_path(&relative);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;

        Ok(StoredFile { path: relative })
    }

    async fn get_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.full_path(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let full = self.full_path(path);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory provider for tests.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn upload_file(&self, file_id: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        let path = format!("files/{file_id}");
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .insert(path.clone(), bytes.to_vec());
        Ok(StoredFile { path })
    }

    async fn get_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_owned()))
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_owned()))
    }
}
