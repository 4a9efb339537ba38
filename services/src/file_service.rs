//! The file lifecycle manager. Files are uploaded as `temporal`, flipped to
//! `active` once a use case references them, and reaped by a periodic sweep
//! if they stay temporal past the TTL.

use chrono::{Duration, Utc};
use db::events::DomainEvent;
use db::models::file::{self, FileStatus};
use log::{info, warn};
use sea_orm::{DatabaseConnection, DbConn};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ErrorCode, ServiceError, ServiceResult};
use crate::propagation;
use crate::storage::{StorageProvider, provider_from_config};

pub const MAX_FILE_SIZE_BYTES: i64 = 5 * 1024 * 1024;
pub const MAX_NAME_LEN: usize = 25;
pub const TEMP_FILE_TTL_MINUTES: i64 = 40;

pub struct FileService {
    storage: Arc<dyn StorageProvider>,
    max_size_bytes: i64,
    temp_ttl_minutes: i64,
}

impl FileService {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self {
            storage,
            max_size_bytes: MAX_FILE_SIZE_BYTES,
            temp_ttl_minutes: TEMP_FILE_TTL_MINUTES,
        }
    }

    pub fn from_config() -> Self {
        let config = common::config::Config::get();
        Self {
            storage: provider_from_config(),
            max_size_bytes: config.max_file_size_bytes as i64,
            temp_ttl_minutes: config.temp_file_ttl_minutes,
        }
    }

    /// Display form of an uploaded file name: 25 chars, extension preserved.
    pub fn truncate_name(original: &str) -> String {
        if original.chars().count() <= MAX_NAME_LEN {
            return original.to_owned();
        }

        match original.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                let stem: String = stem.chars().take(MAX_NAME_LEN).collect();
                format!("{stem}.{ext}")
            }
            _ => original.chars().take(MAX_NAME_LEN).collect(),
        }
    }

    /// Stores the bytes and persists metadata with `status=temporal`.
    ///
    /// The size check runs before anything else: an oversized upload never
    /// leaves a metadata row behind. A storage write failure is fatal,
    /// unlike read/delete failures elsewhere in the lifecycle.
    pub async fn upload(
        &self,
        db: &DbConn,
        bytes: &[u8],
        original_name: &str,
        mimetype: &str,
        owner_user_id: i64,
    ) -> ServiceResult<file::Model> {
        let size = bytes.len() as i64;
        if size > self.max_size_bytes {
            return Err(ServiceError::BadRequest(ErrorCode::FileSizeTooLarge));
        }

        let file_id = Uuid::new_v4().to_string();

        let stored = self.storage.upload_file(&file_id, bytes).await.map_err(|e| {
            warn!("storage upload for file {} failed: {}", file_id, e);
            ServiceError::Internal(ErrorCode::FileSaveFailed)
        })?;

        let name = Self::truncate_name(original_name);
        let model = file::Model::create_temporal(
            db,
            &file_id,
            &name,
            &stored.path,
            mimetype,
            size,
            owner_user_id,
        )
        .await?;

        propagation::emit(
            db,
            DomainEvent::FileUploaded {
                file_id: model.id.clone(),
                owner_user_id,
                size,
                uploaded_at: model.created_at,
            },
        )
        .await;

        Ok(model)
    }

    /// Bulk flip to `active`. Idempotent; an empty input is a no-op.
    pub async fn activate(&self, db: &DbConn, file_ids: &[String]) -> ServiceResult<u64> {
        if file_ids.is_empty() {
            return Ok(0);
        }

        let flipped = file::Model::activate_many(db, file_ids).await?;

        propagation::emit(
            db,
            DomainEvent::FileActivated {
                file_ids: file_ids.to_vec(),
                activated_at: Utc::now(),
            },
        )
        .await;

        Ok(flipped)
    }

    /// Metadata-level existence. Storage-layer absence does not invalidate
    /// a present metadata row: a transient storage error must not block the
    /// enclosing ticket flow, so only the metadata store is consulted.
    pub async fn exists(&self, db: &DbConn, file_id: &str) -> ServiceResult<bool> {
        if Uuid::parse_str(file_id).is_err() {
            return Ok(false);
        }

        Ok(file::Model::find_by_id(db, file_id).await?.is_some())
    }

    pub async fn get(&self, db: &DbConn, file_id: &str) -> ServiceResult<Vec<u8>> {
        let model = file::Model::find_by_id(db, file_id)
            .await?
            .ok_or(ServiceError::NotFound(ErrorCode::FileNotFound))?;

        self.storage.get_file(&model.path).await.map_err(|e| {
            warn!("storage read for file {} failed: {}", model.id, e);
            ServiceError::Internal(ErrorCode::FileReadFailed)
        })
    }

    /// Best-effort storage delete (failure logged, swallowed) followed by a
    /// mandatory metadata delete. Returns `false` if the row was already gone.
    pub async fn delete(&self, db: &DbConn, file_id: &str) -> ServiceResult<bool> {
        let model = match file::Model::find_by_id(db, file_id).await? {
            Some(model) => model,
            None => return Ok(false),
        };

        if let Err(e) = self.storage.delete_file(&model.path).await {
            warn!("storage delete for file {} failed: {}", model.id, e);
        }

        let deleted = file::Model::delete_by_id(db, file_id).await?;

        if deleted {
            propagation::emit(
                db,
                DomainEvent::FileDeleted {
                    file_id: file_id.to_owned(),
                    deleted_at: Utc::now(),
                },
            )
            .await;
        }

        Ok(deleted)
    }

    /// Reaps temporal files older than the TTL. One file failing never
    /// aborts the rest of the batch.
    pub async fn cleanup_sweep(&self, db: &DbConn) -> ServiceResult<u64> {
        let cutoff = Utc::now() - Duration::minutes(self.temp_ttl_minutes);
        let stale = file::Model::find_stale_temporal(db, cutoff).await?;
        let candidates = stale.len();

        let mut deleted = 0u64;
        for model in stale {
            debug_assert_eq!(model.status, FileStatus::Temporal);
            match self.delete(db, &model.id).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!("cleanup of file {} failed: {}", model.id, e),
            }
        }

        if candidates > 0 {
            info!("file cleanup sweep removed {deleted}/{candidates} stale temporal files");
        }

        Ok(deleted)
    }

    /// Background loop running the sweep on its own schedule, independent of
    /// request handling.
    pub fn spawn_cleanup(
        self: Arc<Self>,
        db: DatabaseConnection,
        period: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if let Err(e) = self.cleanup_sweep(&db).await {
                    warn!("file cleanup sweep failed: {e}");
                }
            }
        })
    }
}
